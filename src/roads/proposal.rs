use crate::geometry::Point;

use super::graph::{RoadType, VertexId};

/// A candidate vertex waiting in the growth frontier.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProposedVertex {
    pub position: Point,
    pub road_type: RoadType,
    /// Committed vertex this proposal grows from
    pub source: VertexId,
    pub source_point: Point,
    /// Cleared when the proposal merges into an existing vertex
    pub propose_more: bool,
}

impl ProposedVertex {
    pub fn new(position: Point, road_type: RoadType, source: VertexId, source_point: Point) -> Self {
        Self {
            position,
            road_type,
            source,
            source_point,
            propose_more: true,
        }
    }

    /// Direction of arrival, from the source towards this proposal.
    pub fn direction_angle(&self) -> f64 {
        self.source_point.angle_to(&self.position)
    }

    /// Move onto an existing vertex; a merged proposal becomes a junction and stops growing.
    pub fn merge_into(&mut self, target: Point) {
        self.position = target;
        self.propose_more = false;
    }
}
