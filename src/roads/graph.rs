//! Road graph: vertices keyed by exact coordinate, directed adjacency sets,
//! and a spatial index mirroring the vertex set.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CityError, Result, MIN_DOMAIN_SIZE};
use crate::geometry::Point;
use crate::spatial::{Neighbour, SpatialIndex};

/// Index of a vertex in the graph's arena.
pub type VertexId = usize;

/// Road class of a vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoadType {
    Main,
    Minor,
}

impl std::fmt::Display for RoadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoadType::Main => write!(f, "main"),
            RoadType::Minor => write!(f, "minor"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadVertex {
    pub point: Point,
    pub road_type: RoadType,
}

/// A directed edge as seen by render consumers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub from: Point,
    pub to: Point,
    /// Main only when both endpoints are main-road vertices
    pub road_type: RoadType,
}

/// Directed road graph over a rectangular domain `[0, width) x [0, height)`.
///
/// The coordinate lookup map and the spatial index always hold the same point
/// set; every mutation goes through methods that update both.
#[derive(Clone, Debug)]
pub struct RoadGraph {
    width: f64,
    height: f64,
    vertices: Vec<RoadVertex>,
    lookup: HashMap<Point, VertexId>,
    neighbours: Vec<BTreeSet<VertexId>>,
    index: SpatialIndex,
}

impl RoadGraph {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width < MIN_DOMAIN_SIZE || height < MIN_DOMAIN_SIZE {
            return Err(CityError::InvalidDomain { width, height });
        }

        Ok(Self {
            width: width as f64,
            height: height as f64,
            vertices: Vec::new(),
            lookup: HashMap::new(),
            neighbours: Vec::new(),
            index: SpatialIndex::new(),
        })
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn is_in_range(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && x < self.width && y >= 0.0 && y < self.height
    }

    fn out_of_range(&self, x: f64, y: f64) -> CityError {
        CityError::OutOfRange {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }

    /// Add a vertex, or return the one already at this exact coordinate.
    /// An existing vertex keeps its original road type.
    pub fn add_vertex(&mut self, x: f64, y: f64, road_type: RoadType) -> Result<VertexId> {
        if !self.is_in_range(x, y) {
            return Err(self.out_of_range(x, y));
        }

        let point = Point::new(x, y);
        if let Some(&id) = self.lookup.get(&point) {
            return Ok(id);
        }

        let id = self.vertices.len();
        self.vertices.push(RoadVertex { point, road_type });
        self.neighbours.push(BTreeSet::new());
        self.lookup.insert(point, id);
        self.index.insert(point, id);
        Ok(id)
    }

    pub fn has_vertex(&self, x: f64, y: f64) -> bool {
        self.lookup.contains_key(&Point::new(x, y))
    }

    pub fn vertex_id(&self, point: Point) -> Option<VertexId> {
        self.lookup.get(&point).copied()
    }

    pub fn vertex(&self, id: VertexId) -> Option<&RoadVertex> {
        self.vertices.get(id)
    }

    /// Insert `to` into the neighbour set of `from`. Returns false if the
    /// edge already existed or either id is unknown.
    pub fn connect(&mut self, from: VertexId, to: VertexId) -> bool {
        if to >= self.vertices.len() {
            return false;
        }
        match self.neighbours.get_mut(from) {
            Some(set) => set.insert(to),
            None => false,
        }
    }

    /// Add a directed edge between two existing vertices, addressed by coordinate.
    pub fn add_edge(&mut self, from: Point, to: Point) -> Result<()> {
        let from_id = self.existing_vertex(from)?;
        let to_id = self.existing_vertex(to)?;
        self.connect(from_id, to_id);
        Ok(())
    }

    /// Remove a directed edge. Returns true if it existed.
    pub fn remove_edge(&mut self, from: Point, to: Point) -> bool {
        match (self.vertex_id(from), self.vertex_id(to)) {
            (Some(from_id), Some(to_id)) => self.neighbours[from_id].remove(&to_id),
            _ => false,
        }
    }

    fn existing_vertex(&self, point: Point) -> Result<VertexId> {
        if !self.is_in_range(point.x, point.y) {
            return Err(self.out_of_range(point.x, point.y));
        }
        self.vertex_id(point).ok_or(CityError::MissingVertex {
            x: point.x,
            y: point.y,
        })
    }

    pub fn neighbours(&self, id: VertexId) -> impl Iterator<Item = VertexId> + '_ {
        self.neighbours.get(id).into_iter().flatten().copied()
    }

    pub fn out_degree(&self, id: VertexId) -> usize {
        self.neighbours.get(id).map_or(0, BTreeSet::len)
    }

    /// Up to `k` vertices nearest to `point`, closest first.
    pub fn k_nearest(&self, point: Point, k: usize) -> Vec<Neighbour> {
        self.index.k_nearest(point, k)
    }

    /// Vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &RoadVertex)> {
        self.vertices.iter().enumerate()
    }

    /// Every directed edge, ordered by source id then target id.
    pub fn edges(&self) -> impl Iterator<Item = RoadEdge> + '_ {
        self.neighbours.iter().enumerate().flat_map(move |(from, targets)| {
            targets.iter().map(move |&to| {
                let a = &self.vertices[from];
                let b = &self.vertices[to];
                let road_type = if a.road_type == RoadType::Main && b.road_type == RoadType::Main {
                    RoadType::Main
                } else {
                    RoadType::Minor
                };
                RoadEdge {
                    from: a.point,
                    to: b.point,
                    road_type,
                }
            })
        })
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.neighbours.iter().map(BTreeSet::len).sum()
    }

    pub fn count_of_type(&self, road_type: RoadType) -> usize {
        self.vertices.iter().filter(|v| v.road_type == road_type).count()
    }

    /// Drop every vertex and edge; the domain size is kept.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.lookup.clear();
        self.neighbours.clear();
        self.index.clear();
    }

    /// Grow the domain by `factor` and rebuild the graph from its own edges:
    /// every edge `(src, dst)` becomes a chain of `segments` edges through
    /// `segments + 1` evenly spaced vertices from `src * factor` to
    /// `dst * factor`, each carrying the road type of `src`.
    ///
    /// Chain points that land outside the scaled domain are skipped and the
    /// chain is broken there.
    pub fn scale_and_subdivide(&mut self, factor: f64, segments: u32) {
        let old_edges: Vec<(Point, Point, RoadType)> = self
            .neighbours
            .iter()
            .enumerate()
            .flat_map(|(from, targets)| {
                let source = self.vertices[from];
                targets
                    .iter()
                    .map(move |&to| (source.point, to, source.road_type))
            })
            .map(|(src, to, road_type)| (src, self.vertices[to].point, road_type))
            .collect();

        self.clear();
        self.width *= factor;
        self.height *= factor;

        let segments = segments.max(1);
        let mut skipped = 0usize;
        for (src, dst, road_type) in old_edges {
            let chain = subdivided_chain(src.scaled(factor), dst.scaled(factor), segments);

            let mut previous: Option<VertexId> = None;
            for point in chain {
                match self.add_vertex(point.x, point.y, road_type) {
                    Ok(id) => {
                        if let Some(prev) = previous {
                            self.connect(prev, id);
                        }
                        previous = Some(id);
                    }
                    Err(_) => {
                        skipped += 1;
                        previous = None;
                    }
                }
            }
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {} subdivision vertices outside the {}x{} domain",
                skipped,
                self.width,
                self.height
            );
        }

        self.rebuild_index();
    }

    /// Replace the spatial index with a balanced tree over the current vertices.
    pub fn rebuild_index(&mut self) {
        let entries = self
            .vertices
            .iter()
            .enumerate()
            .map(|(id, v)| (v.point, id))
            .collect();
        self.index.rebuild(entries);
    }
}

/// `segments + 1` points from `start` to `end`. Interior points are
/// interpolated from the lexicographically smaller endpoint, so an edge and
/// its reverse share bit-identical vertices.
fn subdivided_chain(start: Point, end: Point, segments: u32) -> Vec<Point> {
    let reversed = (end.x, end.y) < (start.x, start.y);
    let (low, high) = if reversed { (end, start) } else { (start, end) };

    let mut chain: Vec<Point> = (0..=segments)
        .map(|i| {
            if i == 0 {
                low
            } else if i == segments {
                high
            } else {
                low.lerp(&high, i as f64 / segments as f64)
            }
        })
        .collect();
    if reversed {
        chain.reverse();
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    #[test]
    fn test_rejects_tiny_domain() {
        assert!(matches!(RoadGraph::new(9, 100), Err(CityError::InvalidDomain { .. })));
        assert!(RoadGraph::new(10, 10).is_ok());
    }

    #[test]
    fn test_vertex_uniqueness() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut graph = RoadGraph::new(50, 50).unwrap();
        let mut distinct = HashSet::new();

        for _ in 0..2000 {
            // small integer grid forces plenty of repeats
            let x = rng.gen_range(0..20) as f64;
            let y = rng.gen_range(0..20) as f64;
            graph.add_vertex(x, y, RoadType::Minor).unwrap();
            distinct.insert(Point::new(x, y));
        }

        assert_eq!(graph.vertex_count(), distinct.len());
        assert_eq!(graph.k_nearest(Point::new(0.0, 0.0), usize::MAX).len(), distinct.len());
    }

    #[test]
    fn test_first_insertion_wins() {
        let mut graph = RoadGraph::new(20, 20).unwrap();
        let a = graph.add_vertex(1.0, 1.0, RoadType::Main).unwrap();
        let b = graph.add_vertex(1.0, 1.0, RoadType::Minor).unwrap();
        assert_eq!(a, b);
        assert_eq!(graph.vertex(a).unwrap().road_type, RoadType::Main);

        // negative zero is the same coordinate
        let c = graph.add_vertex(0.0, 2.0, RoadType::Minor).unwrap();
        let d = graph.add_vertex(-0.0, 2.0, RoadType::Minor).unwrap();
        assert_eq!(c, d);
    }

    #[test]
    fn test_range_checks() {
        let mut graph = RoadGraph::new(20, 30).unwrap();
        assert!(graph.is_in_range(0.0, 0.0));
        assert!(graph.is_in_range(19.999, 29.999));
        assert!(!graph.is_in_range(20.0, 5.0));
        assert!(!graph.is_in_range(5.0, -0.001));
        assert!(!graph.is_in_range(f64::NAN, 1.0));

        assert!(matches!(
            graph.add_vertex(20.0, 1.0, RoadType::Main),
            Err(CityError::OutOfRange { .. })
        ));
        assert_eq!(graph.vertex_count(), 0);
    }

    #[test]
    fn test_add_and_remove_edge() {
        let mut graph = RoadGraph::new(20, 20).unwrap();
        let a = Point::new(1.0, 1.0);
        let b = Point::new(2.0, 2.0);
        graph.add_vertex(a.x, a.y, RoadType::Main).unwrap();

        assert!(matches!(graph.add_edge(a, b), Err(CityError::MissingVertex { .. })));
        assert!(matches!(
            graph.add_edge(a, Point::new(25.0, 1.0)),
            Err(CityError::OutOfRange { .. })
        ));

        graph.add_vertex(b.x, b.y, RoadType::Minor).unwrap();
        graph.add_edge(a, b).unwrap();
        graph.add_edge(a, b).unwrap();
        assert_eq!(graph.edge_count(), 1);

        let edge = graph.edges().next().unwrap();
        assert_eq!(edge.from, a);
        assert_eq!(edge.to, b);
        assert_eq!(edge.road_type, RoadType::Minor);

        assert!(graph.remove_edge(a, b));
        assert!(!graph.remove_edge(a, b));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_scale_and_subdivide_topology() {
        let mut graph = RoadGraph::new(100, 100).unwrap();
        let pts = [
            Point::new(10.0, 10.0),
            Point::new(30.0, 10.0),
            Point::new(30.0, 45.5),
            Point::new(72.25, 80.0),
        ];
        let mut ids = Vec::new();
        for p in &pts {
            ids.push(graph.add_vertex(p.x, p.y, RoadType::Main).unwrap());
        }
        graph.connect(ids[1], ids[0]);
        graph.connect(ids[2], ids[1]);
        graph.connect(ids[3], ids[2]);
        graph.connect(ids[0], ids[3]);
        let old_edges: Vec<RoadEdge> = graph.edges().collect();
        let edge_count = graph.edge_count();

        let factor = 3.0;
        let segments = 6;
        graph.scale_and_subdivide(factor, segments);

        assert_eq!(graph.width(), 300.0);
        assert_eq!(graph.edge_count(), edge_count * segments as usize);

        for (_, v) in graph.vertices() {
            assert_eq!(v.road_type, RoadType::Main);
            let on_some_edge = old_edges.iter().any(|e| {
                let a = e.from.scaled(factor);
                let b = e.to.scaled(factor);
                let cross = (b.x - a.x) * (v.point.y - a.y) - (b.y - a.y) * (v.point.x - a.x);
                let within = v.point.x >= a.x.min(b.x) - 1e-9
                    && v.point.x <= a.x.max(b.x) + 1e-9
                    && v.point.y >= a.y.min(b.y) - 1e-9
                    && v.point.y <= a.y.max(b.y) + 1e-9;
                cross.abs() < 1e-6 && within
            });
            assert!(on_some_edge, "{} is not on a scaled edge", v.point);
        }

        // chain endpoints are exact
        for p in &pts {
            assert!(graph.has_vertex(p.x * factor, p.y * factor));
        }
    }

    #[test]
    fn test_subdivide_keeps_source_type() {
        let mut graph = RoadGraph::new(50, 50).unwrap();
        let a = graph.add_vertex(5.0, 5.0, RoadType::Minor).unwrap();
        let b = graph.add_vertex(15.0, 5.0, RoadType::Main).unwrap();
        graph.connect(a, b);
        graph.scale_and_subdivide(2.0, 4);

        // b's scaled position was first created by a's chain
        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.count_of_type(RoadType::Minor), 5);
    }

    #[test]
    fn test_opposite_edges_share_subdivision_vertices() {
        let mut graph = RoadGraph::new(100, 100).unwrap();
        let a = graph.add_vertex(11.3, 27.9, RoadType::Main).unwrap();
        let b = graph.add_vertex(31.7, 13.1, RoadType::Main).unwrap();
        graph.connect(a, b);
        graph.connect(b, a);

        graph.scale_and_subdivide(3.0, 6);

        assert_eq!(graph.vertex_count(), 7);
        assert_eq!(graph.edge_count(), 12);
        let points: Vec<Point> = graph.vertices().map(|(_, v)| v.point).collect();
        for (i, p) in points.iter().enumerate() {
            for q in &points[i + 1..] {
                assert!(p.distance(q) > 1e-6, "{} and {} nearly coincide", p, q);
            }
        }
    }

    #[test]
    fn test_subdivided_chain_keeps_direction() {
        let start = Point::new(90.0, 10.0);
        let end = Point::new(10.0, 50.0);
        let forward = subdivided_chain(start, end, 4);
        let mut backward = subdivided_chain(end, start, 4);
        backward.reverse();

        assert_eq!(forward.first(), Some(&start));
        assert_eq!(forward.last(), Some(&end));
        assert_eq!(forward, backward);
    }
}
