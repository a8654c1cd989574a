//! Road network: graph storage, growth rules and the two-layer generator.

pub mod generator;
pub mod graph;
pub mod proposal;
pub mod rules;

pub use generator::{GrowthReport, RoadNetworkGenerator};
pub use graph::{RoadEdge, RoadGraph, RoadType, RoadVertex, VertexId};
pub use proposal::ProposedVertex;
pub use rules::{ExpansionRule, GridRule};
