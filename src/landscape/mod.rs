//! Landscape synthesis: a river and a mosaic of typed land-use regions.

pub mod regions;
pub mod river;
pub mod spline;
pub mod voronoi;

pub use regions::{Region, RegionMap, RegionType};
pub use river::River;

use crate::config::CityConfig;
use crate::error::{CityError, Result, MIN_DOMAIN_SIZE};
use crate::seeds::CitySeeds;

/// The river and region partition of one city.
#[derive(Clone, Debug)]
pub struct Landscape {
    pub width: u32,
    pub height: u32,
    pub river: River,
    pub regions: RegionMap,
}

impl Landscape {
    /// Place the river first; the region ranking is centred on it.
    pub fn generate(config: &CityConfig, seeds: &CitySeeds) -> Result<Self> {
        let (width, height) = (config.world.width, config.world.height);
        if width < MIN_DOMAIN_SIZE || height < MIN_DOMAIN_SIZE {
            return Err(CityError::InvalidDomain { width, height });
        }

        let river = River::generate(
            width as f64,
            height as f64,
            config.world.noise_scale,
            &config.river,
            seeds,
        );
        let regions = RegionMap::generate(width as f64, height as f64, &config.regions, seeds, &river);

        Ok(Self {
            width,
            height,
            river,
            regions,
        })
    }
}
