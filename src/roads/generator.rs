//! Frontier-driven road growth.
//!
//! Growth runs in two layers. The main layer grows from a single reference
//! vertex in a domain `scale_factor` times smaller than the world; the graph is
//! then scaled up and every main edge subdivided, and a minor layer grows from
//! perpendicular offsets of the main-road vertices. The whole process is
//! retried until the graph reaches the configured minimum size or the attempt
//! budget runs out.

use std::collections::VecDeque;

use crate::config::{CityConfig, RoadClassParams};
use crate::error::{CityError, Result};
use crate::geometry::Point;
use crate::seeds::CitySeeds;

use super::graph::{RoadGraph, RoadType};
use super::proposal::ProposedVertex;
use super::rules::{ExpansionRule, GridRule};

/// Candidates examined by the merge search; the excluded own and source
/// positions can take at most two of them.
const MERGE_CANDIDATES: usize = 3;

/// Outcome of a full generation.
#[derive(Debug)]
pub struct GrowthReport {
    pub attempts: usize,
    pub vertex_count: usize,
    pub edge_count: usize,
    /// `GenerationExhausted` when the minimum vertex count was never reached
    pub shortfall: Option<CityError>,
}

impl GrowthReport {
    pub fn is_complete(&self) -> bool {
        self.shortfall.is_none()
    }
}

pub struct RoadNetworkGenerator<R = GridRule> {
    graph: RoadGraph,
    frontier: VecDeque<ProposedVertex>,
    rule: R,
    config: CityConfig,
}

impl RoadNetworkGenerator<GridRule> {
    pub fn new(config: &CityConfig, seeds: &CitySeeds) -> Result<Self> {
        Self::with_rule(config, GridRule::from_config(config, seeds))
    }
}

impl<R: ExpansionRule> RoadNetworkGenerator<R> {
    /// Start with an empty graph over the backbone domain.
    pub fn with_rule(config: &CityConfig, rule: R) -> Result<Self> {
        config.validate()?;
        let (width, height) = config.backbone_domain();
        Ok(Self {
            graph: RoadGraph::new(width, height)?,
            frontier: VecDeque::new(),
            rule,
            config: config.clone(),
        })
    }

    /// Start from an existing graph (used to grow onto hand-built layouts).
    pub fn from_graph(config: &CityConfig, graph: RoadGraph, rule: R) -> Self {
        Self {
            graph,
            frontier: VecDeque::new(),
            rule,
            config: config.clone(),
        }
    }

    pub fn graph(&self) -> &RoadGraph {
        &self.graph
    }

    pub fn into_graph(self) -> RoadGraph {
        self.graph
    }

    fn params(&self, road_type: RoadType) -> &RoadClassParams {
        match road_type {
            RoadType::Main => &self.config.main,
            RoadType::Minor => &self.config.minor,
        }
    }

    /// Run both layers, retrying until the graph is large enough.
    ///
    /// Running out of attempts is not an error: the last graph is kept and the
    /// shortfall is recorded in the report.
    pub fn generate(&mut self) -> Result<GrowthReport> {
        let max_attempts = self.config.world.max_growth_attempts.max(1);
        let minimum = self.config.world.minimum_vertices;
        let mut backbone_built = false;
        let mut attempts = 0;

        while attempts < max_attempts {
            attempts += 1;

            if attempts > 1 && self.config.world.clear_on_retry {
                let (width, height) = self.config.backbone_domain();
                self.graph = RoadGraph::new(width, height)?;
                self.frontier.clear();
                backbone_built = false;
            }

            if !backbone_built {
                self.grow_main_layer()?;
                backbone_built = true;
            }
            self.grow_minor_layer();

            log::debug!(
                "Road attempt {}: {} vertices, {} edges",
                attempts,
                self.graph.vertex_count(),
                self.graph.edge_count()
            );

            if self.graph.vertex_count() >= minimum {
                break;
            }
        }

        let shortfall = if self.graph.vertex_count() < minimum {
            log::warn!(
                "Road network has {} vertices after {} attempts (wanted {})",
                self.graph.vertex_count(),
                attempts,
                minimum
            );
            Some(CityError::GenerationExhausted {
                stage: "road network",
                attempts,
            })
        } else {
            None
        };

        Ok(GrowthReport {
            attempts,
            vertex_count: self.graph.vertex_count(),
            edge_count: self.graph.edge_count(),
            shortfall,
        })
    }

    fn grow_main_layer(&mut self) -> Result<()> {
        let initial = self.main_frontier()?;
        self.grow(initial);
        log::info!(
            "Main layer grown: {} vertices, {} edges",
            self.graph.vertex_count(),
            self.graph.edge_count()
        );

        let backbone = self.config.backbone;
        self.graph
            .scale_and_subdivide(backbone.scale_factor as f64, backbone.subdivide_count);
        log::info!(
            "Backbone scaled x{} and subdivided x{}: {} vertices",
            backbone.scale_factor,
            backbone.subdivide_count,
            self.graph.vertex_count()
        );
        Ok(())
    }

    fn grow_minor_layer(&mut self) {
        let before = self.graph.vertex_count();
        let initial = self.minor_frontier();
        self.grow(initial);
        log::info!(
            "Minor layer grown: {} new vertices, {} total",
            self.graph.vertex_count() - before,
            self.graph.vertex_count()
        );
    }

    /// A reference vertex at the domain centre and one main-road proposal above it.
    pub fn main_frontier(&mut self) -> Result<Vec<ProposedVertex>> {
        let centre = Point::new(self.graph.width() / 2.0, self.graph.height() / 2.0);
        let reference = self.graph.add_vertex(centre.x, centre.y, RoadType::Main)?;
        let length = self.config.main.road_length;

        Ok(vec![ProposedVertex::new(
            Point::new(centre.x, centre.y + length),
            RoadType::Main,
            reference,
            centre,
        )])
    }

    /// Perpendicular minor-road proposals on both sides of every main vertex
    /// with exactly one outgoing edge, at that edge's length.
    pub fn minor_frontier(&self) -> Vec<ProposedVertex> {
        let mut initial = Vec::new();

        for (id, vertex) in self.graph.vertices() {
            if vertex.road_type != RoadType::Main || self.graph.out_degree(id) != 1 {
                continue;
            }
            let Some(neighbour) = self.graph.neighbours(id).next().and_then(|n| self.graph.vertex(n)) else {
                continue;
            };

            let origin = vertex.point;
            let angle = origin.angle_to(&neighbour.point) + std::f64::consts::FRAC_PI_2;
            let length = origin.distance(&neighbour.point);

            initial.push(ProposedVertex::new(origin.offset(angle, length), RoadType::Minor, id, origin));
            initial.push(ProposedVertex::new(origin.offset(angle, -length), RoadType::Minor, id, origin));
        }

        initial
    }

    /// Drain the frontier, committing accepted proposals and expanding them.
    /// Returns the number of proposals committed.
    pub fn grow<I>(&mut self, initial: I) -> usize
    where
        I: IntoIterator<Item = ProposedVertex>,
    {
        self.frontier.extend(initial);

        let mut committed = 0;
        let mut proposed = Vec::new();

        while let Some(mut proposal) = self.frontier.pop_front() {
            if !self.accept_local_constraints(&mut proposal) {
                continue;
            }

            // merging may have moved it
            let position = proposal.position;
            if !self.graph.is_in_range(position.x, position.y) {
                continue;
            }

            let id = match self.graph.add_vertex(position.x, position.y, proposal.road_type) {
                Ok(id) => id,
                Err(_) => continue,
            };
            self.graph.connect(id, proposal.source);
            committed += 1;

            if proposal.propose_more {
                proposed.clear();
                self.rule.suggest(&proposal, id, &mut proposed);
                self.frontier.extend(proposed.drain(..));
            }
        }

        committed
    }

    /// Drop proposals that are out of range or duplicate an existing vertex;
    /// snap the rest onto a nearby vertex when one is within the merge threshold.
    fn accept_local_constraints(&self, proposal: &mut ProposedVertex) -> bool {
        let position = proposal.position;
        if !self.graph.is_in_range(position.x, position.y) {
            return false;
        }

        if self.graph.has_vertex(position.x, position.y) {
            return false;
        }

        let threshold = self.params(proposal.road_type).merge_threshold;
        if let Some(target) = self.find_merge_target(proposal, threshold) {
            proposal.merge_into(target);
        }

        true
    }

    /// Closest vertex within `threshold` of the proposal, ignoring vertices at
    /// the proposal's own position and at its source.
    fn find_merge_target(&self, proposal: &ProposedVertex, threshold: f64) -> Option<Point> {
        let threshold_sq = threshold * threshold;

        self.graph
            .k_nearest(proposal.position, MERGE_CANDIDATES)
            .into_iter()
            .filter(|n| n.point != proposal.position && n.point != proposal.source_point)
            .find(|n| n.distance_sq <= threshold_sq)
            .map(|n| n.point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roads::graph::VertexId;

    /// Never proposes anything, so only the seeded proposals are processed.
    struct NoExpansion;

    impl ExpansionRule for NoExpansion {
        fn suggest(&mut self, _: &ProposedVertex, _: VertexId, _: &mut Vec<ProposedVertex>) {}
    }

    fn small_config() -> CityConfig {
        let mut config = CityConfig::default();
        config.world.width = 100;
        config.world.height = 100;
        config.backbone.scale_factor = 1;
        config
    }

    fn generator_with_source() -> (RoadNetworkGenerator<NoExpansion>, VertexId, Point) {
        let config = small_config();
        let mut graph = RoadGraph::new(100, 100).unwrap();
        let source_point = Point::new(50.0, 20.0);
        let source = graph.add_vertex(source_point.x, source_point.y, RoadType::Main).unwrap();
        (RoadNetworkGenerator::from_graph(&config, graph, NoExpansion), source, source_point)
    }

    #[test]
    fn test_merge_symmetry() {
        let a = Point::new(50.0, 60.0);
        let b = Point::new(55.0, 61.0);

        let mut counts = Vec::new();
        for order in [[a, b], [b, a]] {
            let (mut gen, source, source_point) = generator_with_source();
            let proposals: Vec<ProposedVertex> = order
                .iter()
                .map(|&p| ProposedVertex::new(p, RoadType::Main, source, source_point))
                .collect();
            gen.grow(proposals);

            // the first proposal wins; the second snaps onto it
            assert!(gen.graph().has_vertex(order[0].x, order[0].y));
            assert!(!gen.graph().has_vertex(order[1].x, order[1].y));
            counts.push(gen.graph().vertex_count());
        }

        assert_eq!(counts, vec![2, 2]);
    }

    #[test]
    fn test_out_of_range_and_duplicates_are_dropped() {
        let (mut gen, source, source_point) = generator_with_source();
        let committed = gen.grow(vec![
            ProposedVertex::new(Point::new(150.0, 50.0), RoadType::Main, source, source_point),
            ProposedVertex::new(source_point, RoadType::Main, source, source_point),
            ProposedVertex::new(Point::new(-1.0, 50.0), RoadType::Minor, source, source_point),
        ]);
        assert_eq!(committed, 0);
        assert_eq!(gen.graph().vertex_count(), 1);
    }

    #[test]
    fn test_source_is_never_a_merge_target() {
        let (mut gen, source, source_point) = generator_with_source();
        // well inside the main threshold of the source
        let near = Point::new(50.0, 25.0);
        gen.grow(vec![ProposedVertex::new(near, RoadType::Main, source, source_point)]);
        assert!(gen.graph().has_vertex(near.x, near.y));
        assert_eq!(gen.graph().edge_count(), 1);
    }

    #[test]
    fn test_minor_threshold_is_tighter() {
        let (mut gen, source, source_point) = generator_with_source();
        let a = Point::new(50.0, 60.0);
        // 12 units apart: merges as a main road (18), not as a minor road (8)
        let b = Point::new(62.0, 60.0);
        gen.grow(vec![
            ProposedVertex::new(a, RoadType::Minor, source, source_point),
            ProposedVertex::new(b, RoadType::Minor, source, source_point),
        ]);
        assert_eq!(gen.graph().vertex_count(), 3);
    }

    #[test]
    fn test_minor_frontier_offsets_are_perpendicular() {
        let config = small_config();
        let mut graph = RoadGraph::new(100, 100).unwrap();
        let a = graph.add_vertex(40.0, 50.0, RoadType::Main).unwrap();
        let b = graph.add_vertex(50.0, 50.0, RoadType::Main).unwrap();
        graph.connect(a, b);
        let gen = RoadNetworkGenerator::from_graph(&config, graph, NoExpansion);

        let frontier = gen.minor_frontier();
        assert_eq!(frontier.len(), 2);
        for p in &frontier {
            assert_eq!(p.source, a);
            assert_eq!(p.road_type, RoadType::Minor);
            assert!((p.position.x - 40.0).abs() < 1e-9);
            assert!(((p.position.y - 50.0).abs() - 10.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_generate_reaches_minimum() {
        let mut config = CityConfig::default();
        config.backbone.scale_factor = 1;
        config.backbone.subdivide_count = 2;
        let seeds = CitySeeds::from_master(42);

        let mut gen = RoadNetworkGenerator::new(&config, &seeds).unwrap();
        let report = gen.generate().unwrap();

        assert!(report.is_complete(), "{:?}", report);
        assert!(gen.graph().vertex_count() >= 100);
        for (_, v) in gen.graph().vertices() {
            assert!(gen.graph().is_in_range(v.point.x, v.point.y));
        }
    }

    #[test]
    fn test_exhaustion_is_reported_not_fatal() {
        let mut config = small_config();
        config.world.minimum_vertices = 1_000_000;
        config.world.max_growth_attempts = 2;
        let seeds = CitySeeds::from_master(7);

        let mut gen = RoadNetworkGenerator::new(&config, &seeds).unwrap();
        let report = gen.generate().unwrap();
        assert_eq!(report.attempts, 2);
        assert!(matches!(
            report.shortfall,
            Some(CityError::GenerationExhausted { attempts: 2, .. })
        ));
        assert_eq!(report.vertex_count, gen.graph().vertex_count());
    }
}
