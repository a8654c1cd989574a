//! Arena-backed 2D k-d tree for nearest neighbour queries.
//!
//! Nodes live in a flat `Vec` and refer to each other by index; each node
//! carries the caller's small integer id for the point rather than a reference
//! to the caller's data. Points can be inserted incrementally; removal is lazy
//! (tombstoned), and [`SpatialIndex::rebuild`] replaces the whole tree with a
//! balanced one.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::geometry::Point;

/// A point returned from a neighbour query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Neighbour {
    pub point: Point,
    pub id: usize,
    pub distance_sq: f64,
}

#[derive(Clone, Debug)]
struct KdNode {
    point: Point,
    id: usize,
    /// Split dimension (0 = x, 1 = y)
    axis: usize,
    left: Option<usize>,
    right: Option<usize>,
    removed: bool,
}

impl KdNode {
    fn split_value(&self) -> f64 {
        axis_value(&self.point, self.axis)
    }
}

fn axis_value(p: &Point, axis: usize) -> f64 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

/// Candidate in the bounded max-heap used by k-nearest search.
struct Candidate {
    distance_sq: f64,
    node: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance_sq
            .total_cmp(&other.distance_sq)
            .then(self.node.cmp(&other.node))
    }
}

/// A mutable point index supporting insertion and k-nearest queries under
/// squared Euclidean distance.
#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    nodes: Vec<KdNode>,
    root: Option<usize>,
    live: usize,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a balanced tree from a batch of `(point, id)` pairs.
    pub fn build(points: Vec<(Point, usize)>) -> Self {
        let mut index = Self::new();
        index.rebuild(points);
        index
    }

    /// Number of live (non-removed) points.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.root = None;
        self.live = 0;
    }

    /// Discard the current tree and build a balanced one from scratch.
    pub fn rebuild(&mut self, mut points: Vec<(Point, usize)>) {
        self.clear();
        self.nodes.reserve(points.len());
        self.live = points.len();
        self.root = self.build_recursive(&mut points, 0);
    }

    fn build_recursive(&mut self, entries: &mut [(Point, usize)], depth: usize) -> Option<usize> {
        if entries.is_empty() {
            return None;
        }

        let axis = depth % 2;
        entries.sort_by(|a, b| axis_value(&a.0, axis).total_cmp(&axis_value(&b.0, axis)));

        let median = entries.len() / 2;
        let (point, id) = entries[median];
        let node = self.nodes.len();
        self.nodes.push(KdNode {
            point,
            id,
            axis,
            left: None,
            right: None,
            removed: false,
        });

        let (left_slice, rest) = entries.split_at_mut(median);
        let right_slice = &mut rest[1..];
        let left = self.build_recursive(left_slice, depth + 1);
        let right = self.build_recursive(right_slice, depth + 1);
        self.nodes[node].left = left;
        self.nodes[node].right = right;

        Some(node)
    }

    /// Insert a point with the caller's id.
    pub fn insert(&mut self, point: Point, id: usize) {
        let new_index = self.nodes.len();
        self.live += 1;

        let Some(mut current) = self.root else {
            self.nodes.push(KdNode {
                point,
                id,
                axis: 0,
                left: None,
                right: None,
                removed: false,
            });
            self.root = Some(new_index);
            return;
        };

        loop {
            let node = &self.nodes[current];
            let go_left = axis_value(&point, node.axis) < node.split_value();
            let next = if go_left { node.left } else { node.right };
            match next {
                Some(child) => current = child,
                None => {
                    let axis = (node.axis + 1) % 2;
                    self.nodes.push(KdNode {
                        point,
                        id,
                        axis,
                        left: None,
                        right: None,
                        removed: false,
                    });
                    let parent = &mut self.nodes[current];
                    if go_left {
                        parent.left = Some(new_index);
                    } else {
                        parent.right = Some(new_index);
                    }
                    return;
                }
            }
        }
    }

    /// Remove every live entry at exactly `point`. Returns how many were removed.
    pub fn remove(&mut self, point: Point) -> usize {
        let mut removed = 0;
        let mut stack: Vec<usize> = self.root.into_iter().collect();
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current];
            if !node.removed && node.point == point {
                node.removed = true;
                removed += 1;
            }
            let target = axis_value(&point, node.axis);
            let split = node.split_value();
            // equal split values may sit on either side after a rebuild
            if target <= split {
                stack.extend(node.left);
            }
            if target >= split {
                stack.extend(node.right);
            }
        }
        self.live -= removed;
        removed
    }

    /// The nearest live point, if any.
    pub fn nearest(&self, point: Point) -> Option<Neighbour> {
        self.k_nearest(point, 1).into_iter().next()
    }

    /// Up to `k` live points ordered by ascending squared distance.
    pub fn k_nearest(&self, point: Point, k: usize) -> Vec<Neighbour> {
        if k == 0 {
            return Vec::new();
        }

        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k.min(self.live) + 1);
        if let Some(root) = self.root {
            self.k_nearest_recursive(root, point, k, &mut heap);
        }

        let mut results: Vec<Neighbour> = heap
            .into_iter()
            .map(|c| {
                let node = &self.nodes[c.node];
                Neighbour {
                    point: node.point,
                    id: node.id,
                    distance_sq: c.distance_sq,
                }
            })
            .collect();
        results.sort_by(|a, b| {
            a.distance_sq
                .total_cmp(&b.distance_sq)
                .then(a.id.cmp(&b.id))
        });
        results
    }

    fn k_nearest_recursive(
        &self,
        index: usize,
        point: Point,
        k: usize,
        heap: &mut BinaryHeap<Candidate>,
    ) {
        let node = &self.nodes[index];

        if !node.removed {
            let distance_sq = node.point.distance_sq(&point);
            if heap.len() < k {
                heap.push(Candidate { distance_sq, node: index });
            } else if heap.peek().map_or(false, |worst| distance_sq < worst.distance_sq) {
                heap.pop();
                heap.push(Candidate { distance_sq, node: index });
            }
        }

        let diff = axis_value(&point, node.axis) - node.split_value();
        // Search the side that contains the query point first
        let (first, second) = if diff < 0.0 {
            (node.left, node.right)
        } else {
            (node.right, node.left)
        };

        if let Some(child) = first {
            self.k_nearest_recursive(child, point, k, heap);
        }

        // Only search the other side if it could contain a closer point
        if let Some(child) = second {
            let worth_visiting = heap.len() < k
                || heap.peek().map_or(true, |worst| diff * diff <= worst.distance_sq);
            if worth_visiting {
                self.k_nearest_recursive(child, point, k, heap);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn brute_force(points: &[(Point, usize)], query: Point, k: usize) -> Vec<f64> {
        let mut d: Vec<f64> = points.iter().map(|(p, _)| p.distance_sq(&query)).collect();
        d.sort_by(|a, b| a.total_cmp(b));
        d.truncate(k);
        d
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::new();
        assert!(index.is_empty());
        assert!(index.nearest(Point::new(0.0, 0.0)).is_none());
        assert!(index.k_nearest(Point::new(0.0, 0.0), 4).is_empty());
    }

    #[test]
    fn test_k_nearest_ordering() {
        let mut index = SpatialIndex::new();
        index.insert(Point::new(10.0, 10.0), 0);
        index.insert(Point::new(20.0, 20.0), 1);
        index.insert(Point::new(50.0, 50.0), 2);

        let results = index.k_nearest(Point::new(0.0, 0.0), 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, 0);
        assert_eq!(results[1].id, 1);
    }

    #[test]
    fn test_incremental_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut index = SpatialIndex::new();
        let mut points = Vec::new();
        for id in 0..500 {
            let p = Point::new(rng.gen_range(0.0..600.0), rng.gen_range(0.0..600.0));
            index.insert(p, id);
            points.push((p, id));
        }

        for _ in 0..100 {
            let q = Point::new(rng.gen_range(-50.0..650.0), rng.gen_range(-50.0..650.0));
            let got: Vec<f64> = index.k_nearest(q, 7).iter().map(|n| n.distance_sq).collect();
            assert_eq!(got, brute_force(&points, q, 7));
        }
    }

    #[test]
    fn test_rebuild_matches_brute_force() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let points: Vec<(Point, usize)> = (0..300)
            .map(|id| (Point::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0)), id))
            .collect();
        let index = SpatialIndex::build(points.clone());
        assert_eq!(index.len(), 300);

        for _ in 0..50 {
            let q = Point::new(rng.gen_range(0.0..100.0), rng.gen_range(0.0..100.0));
            let got: Vec<f64> = index.k_nearest(q, 5).iter().map(|n| n.distance_sq).collect();
            assert_eq!(got, brute_force(&points, q, 5));
        }
    }

    #[test]
    fn test_remove_and_clear() {
        let mut index = SpatialIndex::new();
        index.insert(Point::new(1.0, 1.0), 0);
        index.insert(Point::new(2.0, 2.0), 1);
        index.insert(Point::new(3.0, 3.0), 2);

        assert_eq!(index.remove(Point::new(1.0, 1.0)), 1);
        assert_eq!(index.len(), 2);
        let nearest = index.nearest(Point::new(0.0, 0.0)).unwrap();
        assert_eq!(nearest.id, 1);
        assert_eq!(index.remove(Point::new(9.0, 9.0)), 0);

        index.clear();
        assert!(index.is_empty());
        assert!(index.nearest(Point::new(2.0, 2.0)).is_none());
    }
}
