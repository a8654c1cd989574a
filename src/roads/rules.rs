//! Expansion rules: how a committed vertex spawns new proposals.

use std::f64::consts::{FRAC_PI_2, PI};

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::{CityConfig, RoadClassParams};
use crate::noise_field::NoiseField;
use crate::seeds::CitySeeds;

use super::graph::{RoadType, VertexId};
use super::proposal::ProposedVertex;

/// Produces follow-up proposals for a freshly committed vertex.
pub trait ExpansionRule {
    /// `source` is the proposal that was just committed as vertex `committed`.
    /// New proposals are appended to `out`.
    fn suggest(&mut self, source: &ProposedVertex, committed: VertexId, out: &mut Vec<ProposedVertex>);
}

/// Left, forward and right, relative to the direction of arrival.
pub const GRID_ANGLES: [f64; 3] = [-FRAC_PI_2, 0.0, PI];

/// A quadrilateral grid bent by the terrain density field.
pub struct GridRule {
    density: NoiseField,
    rng: ChaCha8Rng,
    main: RoadClassParams,
    minor: RoadClassParams,
}

impl GridRule {
    pub fn new(density: NoiseField, rng: ChaCha8Rng, main: RoadClassParams, minor: RoadClassParams) -> Self {
        Self {
            density,
            rng,
            main,
            minor,
        }
    }

    pub fn from_config(config: &CityConfig, seeds: &CitySeeds) -> Self {
        Self::new(
            NoiseField::new(seeds.density, config.world.noise_scale),
            CitySeeds::rng(seeds.roads),
            config.main,
            config.minor,
        )
    }

    fn params(&self, road_type: RoadType) -> &RoadClassParams {
        match road_type {
            RoadType::Main => &self.main,
            RoadType::Minor => &self.minor,
        }
    }

    /// Bend applied to every proposed direction at a given density.
    pub fn angle_offset(density: f64, params: &RoadClassParams) -> f64 {
        let variation = params.angle_variation_min
            + (params.angle_variation_max - params.angle_variation_min) * density;
        density / variation
    }
}

impl ExpansionRule for GridRule {
    fn suggest(&mut self, source: &ProposedVertex, committed: VertexId, out: &mut Vec<ProposedVertex>) {
        let params = *self.params(source.road_type);
        let origin = source.position;
        let density = self.density.value(origin.x, origin.y);
        let offset = Self::angle_offset(density, &params);
        let heading = source.direction_angle();

        for grid_angle in GRID_ANGLES {
            if self.rng.gen::<f64>() < params.road_chance {
                let target = origin.offset(grid_angle + heading + offset, params.road_length);
                out.push(ProposedVertex::new(target, source.road_type, committed, origin));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use rand::SeedableRng;

    fn rule_with_chance(chance: f64) -> GridRule {
        let mut main = RoadClassParams::main_roads();
        main.road_chance = chance;
        GridRule::new(
            NoiseField::new(1, 50.0),
            ChaCha8Rng::seed_from_u64(1),
            main,
            RoadClassParams::minor_roads(),
        )
    }

    #[test]
    fn test_certain_chance_proposes_three() {
        let mut rule = rule_with_chance(1.0);
        let source = ProposedVertex::new(Point::new(100.0, 120.0), RoadType::Main, 0, Point::new(100.0, 100.0));
        let mut out = Vec::new();
        rule.suggest(&source, 7, &mut out);

        assert_eq!(out.len(), 3);
        for p in &out {
            assert_eq!(p.source, 7);
            assert_eq!(p.source_point, source.position);
            assert_eq!(p.road_type, RoadType::Main);
            assert!((p.position.distance(&source.position) - 20.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_zero_chance_proposes_nothing() {
        let mut rule = rule_with_chance(0.0);
        let source = ProposedVertex::new(Point::new(50.0, 60.0), RoadType::Main, 0, Point::new(50.0, 40.0));
        let mut out = Vec::new();
        rule.suggest(&source, 1, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_angle_offset_is_small_bend() {
        let params = RoadClassParams::main_roads();
        assert_eq!(GridRule::angle_offset(0.0, &params), 0.0);
        let full = GridRule::angle_offset(1.0, &params);
        assert!((full - 1.0 / 15.0).abs() < 1e-12);
    }
}
