//! Planar geometry shared by the road and landscape generators.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// A real-valued 2D coordinate.
///
/// Equality is exact coordinate equality, which makes a `Point` usable as a
/// graph vertex key. `-0.0` and `0.0` compare and hash equal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_sq(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: &Point) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Angle in radians of the direction from `self` to `other`.
    pub fn angle_to(&self, other: &Point) -> f64 {
        (other.y - self.y).atan2(other.x - self.x)
    }

    /// The point `length` away from `self` along `angle` (radians).
    pub fn offset(&self, angle: f64, length: f64) -> Point {
        Point::new(self.x + angle.cos() * length, self.y + angle.sin() * length)
    }

    pub fn scaled(&self, factor: f64) -> Point {
        Point::new(self.x * factor, self.y * factor)
    }

    /// Linear interpolation between two points.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn key_bits(v: f64) -> u64 {
        // fold -0.0 onto 0.0 so Hash agrees with PartialEq
        if v == 0.0 {
            0.0f64.to_bits()
        } else {
            v.to_bits()
        }
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Self::key_bits(self.x).hash(state);
        Self::key_bits(self.y).hash(state);
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Sort points by their angle around `centre`, ascending in `(-PI, PI]`.
pub fn sort_by_angle(points: &mut [Point], centre: Point) {
    points.sort_by(|a, b| {
        let angle_a = centre.angle_to(a);
        let angle_b = centre.angle_to(b);
        angle_a
            .partial_cmp(&angle_b)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// Remove consecutive duplicates, including a last point equal to the first.
pub fn dedup_ring(points: &mut Vec<Point>) {
    points.dedup();
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
}

/// Signed area of a polygon (positive when counter-clockwise in a y-up frame).
/// Returns 0.0 for polygons with fewer than 3 vertices.
pub fn polygon_area(polygon: &[Point]) -> f64 {
    if polygon.len() < 3 {
        return 0.0;
    }

    let n = polygon.len();
    let mut area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        area += polygon[i].x * polygon[j].y - polygon[j].x * polygon[i].y;
    }

    area / 2.0
}

/// Area centroid of a polygon. Falls back to the vertex average for degenerate polygons.
pub fn polygon_centroid(polygon: &[Point]) -> Option<Point> {
    if polygon.is_empty() {
        return None;
    }

    let area = polygon_area(polygon);
    if area.abs() < f64::EPSILON {
        let n = polygon.len() as f64;
        let sum = polygon
            .iter()
            .fold(Point::default(), |acc, p| Point::new(acc.x + p.x, acc.y + p.y));
        return Some(Point::new(sum.x / n, sum.y / n));
    }

    let n = polygon.len();
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        let cross = polygon[i].x * polygon[j].y - polygon[j].x * polygon[i].y;
        cx += (polygon[i].x + polygon[j].x) * cross;
        cy += (polygon[i].y + polygon[j].y) * cross;
    }

    let area_6 = 6.0 * area;
    Some(Point::new(cx / area_6, cy / area_6))
}

/// Circumcenter of a triangle, falling back to the triangle centroid when the
/// points are collinear.
pub fn circumcenter(a: Point, b: Point, c: Point) -> Point {
    // d = 2 * det | 1 ax ay |
    //             | 1 bx by |
    //             | 1 cx cy |
    let d = 2.0 * (a.x * (b.y - c.y) + b.x * (c.y - a.y) + c.x * (a.y - b.y));

    if d.abs() < f64::EPSILON {
        return Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0);
    }

    let a2 = a.x * a.x + a.y * a.y;
    let b2 = b.x * b.x + b.y * b.y;
    let c2 = c.x * c.x + c.y * c.y;

    let ux = (a2 * (b.y - c.y) + b2 * (c.y - a.y) + c2 * (a.y - b.y)) / d;
    let uy = (a2 * (c.x - b.x) + b2 * (a.x - c.x) + c2 * (b.x - a.x)) / d;

    Point::new(ux, uy)
}

/// Clip a convex polygon against the axis-aligned rectangle `[0, width] x [0, height]`
/// (Sutherland-Hodgman).
pub fn clip_to_rect(polygon: &[Point], width: f64, height: f64) -> Vec<Point> {
    #[derive(Clone, Copy)]
    enum Edge {
        Left,
        Right,
        Top,
        Bottom,
    }

    let inside = |p: &Point, edge: Edge| match edge {
        Edge::Left => p.x >= 0.0,
        Edge::Right => p.x <= width,
        Edge::Top => p.y >= 0.0,
        Edge::Bottom => p.y <= height,
    };

    let intersect = |a: &Point, b: &Point, edge: Edge| {
        let t = match edge {
            Edge::Left => (0.0 - a.x) / (b.x - a.x),
            Edge::Right => (width - a.x) / (b.x - a.x),
            Edge::Top => (0.0 - a.y) / (b.y - a.y),
            Edge::Bottom => (height - a.y) / (b.y - a.y),
        };
        let mut p = a.lerp(b, t);
        // snap onto the clip line exactly
        match edge {
            Edge::Left => p.x = 0.0,
            Edge::Right => p.x = width,
            Edge::Top => p.y = 0.0,
            Edge::Bottom => p.y = height,
        }
        p
    };

    let mut output = polygon.to_vec();
    for edge in [Edge::Left, Edge::Right, Edge::Top, Edge::Bottom] {
        if output.is_empty() {
            break;
        }
        let input = std::mem::take(&mut output);
        for i in 0..input.len() {
            let current = input[i];
            let previous = input[(i + input.len() - 1) % input.len()];

            match (inside(&current, edge), inside(&previous, edge)) {
                (true, true) => output.push(current),
                (true, false) => {
                    output.push(intersect(&previous, &current, edge));
                    output.push(current);
                }
                (false, true) => output.push(intersect(&previous, &current, edge)),
                (false, false) => {}
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_point_key_semantics() {
        let mut set = HashSet::new();
        set.insert(Point::new(0.0, 1.5));
        set.insert(Point::new(-0.0, 1.5));
        set.insert(Point::new(0.0, 1.5000001));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_offset_and_angle() {
        let origin = Point::new(10.0, 10.0);
        let p = origin.offset(std::f64::consts::FRAC_PI_2, 5.0);
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y - 15.0).abs() < 1e-9);
        assert!((origin.angle_to(&p) - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_square_area_and_centroid() {
        let square = vec![
            Point::new(0.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(4.0, 4.0),
            Point::new(0.0, 4.0),
        ];
        assert!((polygon_area(&square) - 16.0).abs() < 1e-9);
        let c = polygon_centroid(&square).unwrap();
        assert!((c.x - 2.0).abs() < 1e-9 && (c.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_circumcenter_right_triangle() {
        let c = circumcenter(Point::new(0.0, 0.0), Point::new(2.0, 0.0), Point::new(0.0, 2.0));
        assert!((c.x - 1.0).abs() < 1e-9 && (c.y - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_sort_by_angle_orders_ring() {
        let centre = Point::new(0.0, 0.0);
        let mut pts = vec![
            Point::new(0.0, 1.0),
            Point::new(-1.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, -1.0),
        ];
        sort_by_angle(&mut pts, centre);
        let angles: Vec<f64> = pts.iter().map(|p| centre.angle_to(p)).collect();
        assert!(angles.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_clip_keeps_inside_and_cuts_outside() {
        let tri = vec![
            Point::new(-5.0, 5.0),
            Point::new(5.0, -5.0),
            Point::new(5.0, 5.0),
        ];
        let clipped = clip_to_rect(&tri, 10.0, 10.0);
        assert!(clipped.len() >= 3);
        for p in &clipped {
            assert!(p.x >= 0.0 && p.x <= 10.0 && p.y >= 0.0 && p.y <= 10.0);
        }
        // only the square [0,5]x[0,5] survives
        assert!((polygon_area(&clipped).abs() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_dedup_ring_removes_wraparound_duplicate() {
        let mut pts = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 0.0),
        ];
        dedup_ring(&mut pts);
        assert_eq!(pts, vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)]);
    }
}
