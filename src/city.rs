//! One complete generation: road network plus landscape.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::CityConfig;
use crate::error::Result;
use crate::landscape::{Landscape, RegionType};
use crate::roads::{GrowthReport, RoadGraph, RoadNetworkGenerator, RoadType};
use crate::seeds::CitySeeds;

/// The result of [`generate_city`]. Read-only for consumers.
#[derive(Debug)]
pub struct City {
    pub seeds: CitySeeds,
    pub roads: RoadGraph,
    pub road_report: GrowthReport,
    pub landscape: Landscape,
}

/// Compact description of a city for logs and JSON output.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CitySummary {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub vertices: usize,
    pub edges: usize,
    pub main_vertices: usize,
    pub minor_vertices: usize,
    pub road_attempts: usize,
    pub roads_complete: bool,
    pub river_points: usize,
    pub river_attempts: usize,
    pub river_complete: bool,
    pub regions: BTreeMap<String, usize>,
}

/// Generate the road network and landscape for one seed set.
///
/// Configuration and domain errors are returned; exhausted retry budgets are
/// not, they are reported in `road_report` and the river's shortfall.
pub fn generate_city(config: &CityConfig, seeds: &CitySeeds) -> Result<City> {
    config.validate()?;

    let mut generator = RoadNetworkGenerator::new(config, seeds)?;
    let road_report = generator.generate()?;
    let roads = generator.into_graph();

    let landscape = Landscape::generate(config, seeds)?;

    Ok(City {
        seeds: seeds.clone(),
        roads,
        road_report,
        landscape,
    })
}

impl City {
    pub fn summary(&self) -> CitySummary {
        let mut regions = BTreeMap::new();
        for region in self.landscape.regions.regions() {
            *regions.entry(region_key(region.region_type)).or_insert(0) += 1;
        }

        CitySummary {
            seed: self.seeds.master,
            width: self.landscape.width,
            height: self.landscape.height,
            vertices: self.roads.vertex_count(),
            edges: self.roads.edge_count(),
            main_vertices: self.roads.count_of_type(RoadType::Main),
            minor_vertices: self.roads.count_of_type(RoadType::Minor),
            road_attempts: self.road_report.attempts,
            roads_complete: self.road_report.is_complete(),
            river_points: self.landscape.river.points().len(),
            river_attempts: self.landscape.river.attempts(),
            river_complete: self.landscape.river.shortfall().is_none(),
            regions,
        }
    }
}

fn region_key(region_type: RegionType) -> String {
    format!("{:?}", region_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_match_city() {
        let mut config = CityConfig::default();
        config.world.width = 300;
        config.world.height = 300;
        config.world.minimum_vertices = 50;
        config.regions.point_count = 60;
        let seeds = CitySeeds::from_master(8);

        let city = generate_city(&config, &seeds).unwrap();
        let summary = city.summary();

        assert_eq!(summary.seed, 8);
        assert_eq!(summary.vertices, city.roads.vertex_count());
        assert_eq!(summary.main_vertices + summary.minor_vertices, summary.vertices);
        assert_eq!(summary.regions.values().sum::<usize>(), city.landscape.regions.len());
        assert!(!summary.regions.contains_key("None"));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut config = CityConfig::default();
        config.main.road_length = -1.0;
        assert!(generate_city(&config, &CitySeeds::from_master(1)).is_err());
    }
}
