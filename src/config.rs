//! City generation parameters.
//!
//! One strongly-typed value is built once (from defaults or a JSON file) and
//! passed by reference into every generator. Deserialization is strict: every
//! key must be present with the declared type and unknown keys are rejected.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CityError, Result, MIN_DOMAIN_SIZE};

/// Complete configuration for one city generation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CityConfig {
    pub world: WorldParams,
    /// Backbone road layer
    pub main: RoadClassParams,
    /// Infill road layer
    pub minor: RoadClassParams,
    pub backbone: BackboneParams,
    pub river: RiverParams,
    pub regions: RegionParams,
}

/// Domain and road-growth budget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WorldParams {
    /// Final domain width, after backbone scaling (default: 600)
    pub width: u32,
    /// Final domain height, after backbone scaling (default: 600)
    pub height: u32,
    /// Spatial scale of the road density field and river scan range (default: 50)
    pub noise_scale: f64,
    /// Road network regrows until it has at least this many vertices (default: 100)
    pub minimum_vertices: usize,
    /// Ceiling on whole-network regrowth attempts (default: 60)
    pub max_growth_attempts: usize,
    /// Discard the graph between regrowth attempts (default: true)
    pub clear_on_retry: bool,
}

/// Geometric parameters of one road class.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoadClassParams {
    /// Proposals within this distance of an existing vertex snap onto it
    pub merge_threshold: f64,
    /// Distance between a vertex and the proposals it spawns
    pub road_length: f64,
    /// Angle variation at density 0
    pub angle_variation_min: f64,
    /// Angle variation at density 1
    pub angle_variation_max: f64,
    /// Probability (0.0-1.0) that each candidate direction is proposed
    pub road_chance: f64,
}

/// Backbone rescale between the main and minor layers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackboneParams {
    /// The main layer grows in a domain this many times smaller (default: 3)
    pub scale_factor: u32,
    /// Each main edge becomes this many edges after scaling (default: 6)
    pub subdivide_count: u32,
}

/// River placement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiverParams {
    /// Minimum number of raw points for a valid river (default: 10)
    pub min_points: usize,
    /// Half-width of the scan cone in radians (default: PI/4)
    pub scan_angle: f64,
    /// Step length as a multiple of `world.noise_scale` (default: 0.5)
    pub scan_range_scale: f64,
    /// Candidate steps evaluated per move (default: 8)
    pub sample_count: usize,
    /// Attempt budget before settling for the last path (default: 500)
    pub max_attempts: usize,
    /// Scale of the terrain field the river descends (default: 10)
    pub density_scale: f64,
    /// Index step of the scan-angle jitter stream (default: 0.5)
    pub jitter_step: f64,
    /// Resampled points per raw segment (default: 3)
    pub interpolation_scale: usize,
    /// Steps after which a single walk is abandoned (default: 10000)
    pub max_walk_steps: usize,
}

/// Voronoi land-use partition.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegionParams {
    /// Number of Voronoi sites (default: 200)
    pub point_count: usize,
    /// Lloyd relaxation iterations (default: 2)
    pub relax_count: usize,
    /// Neighbours examined per typed region in each growth pass (default: 6)
    pub growth_neighbours: usize,
    /// Scale of the commercialisation axis (default: 30)
    pub commercial_scale: f64,
    /// Scale of the residential density axis (default: 150)
    pub density_scale: f64,
}

impl Default for WorldParams {
    fn default() -> Self {
        Self {
            width: 600,
            height: 600,
            noise_scale: 50.0,
            minimum_vertices: 100,
            max_growth_attempts: 60,
            clear_on_retry: true,
        }
    }
}

impl RoadClassParams {
    pub fn main_roads() -> Self {
        Self {
            merge_threshold: 18.0,
            road_length: 20.0,
            angle_variation_min: 7.0,
            angle_variation_max: 15.0,
            road_chance: 0.8,
        }
    }

    pub fn minor_roads() -> Self {
        Self {
            merge_threshold: 8.0,
            road_length: 10.0,
            angle_variation_min: 5.0,
            angle_variation_max: 10.0,
            road_chance: 0.7,
        }
    }

    fn validate(&self, section: &str) -> Result<()> {
        positive(section, "merge_threshold", self.merge_threshold)?;
        positive(section, "road_length", self.road_length)?;
        positive(section, "angle_variation_min", self.angle_variation_min)?;
        positive(section, "angle_variation_max", self.angle_variation_max)?;
        if self.angle_variation_min > self.angle_variation_max {
            return Err(CityError::config(
                format!("{}.angle_variation_min", section),
                "must not exceed angle_variation_max",
            ));
        }
        if !(0.0..=1.0).contains(&self.road_chance) {
            return Err(CityError::config(
                format!("{}.road_chance", section),
                "must be within [0, 1]",
            ));
        }
        Ok(())
    }
}

impl Default for BackboneParams {
    fn default() -> Self {
        Self {
            scale_factor: 3,
            subdivide_count: 6,
        }
    }
}

impl Default for RiverParams {
    fn default() -> Self {
        Self {
            min_points: 10,
            scan_angle: std::f64::consts::FRAC_PI_4,
            scan_range_scale: 0.5,
            sample_count: 8,
            max_attempts: 500,
            density_scale: 10.0,
            jitter_step: 0.5,
            interpolation_scale: 3,
            max_walk_steps: 10_000,
        }
    }
}

impl Default for RegionParams {
    fn default() -> Self {
        Self {
            point_count: 200,
            relax_count: 2,
            growth_neighbours: 6,
            commercial_scale: 30.0,
            density_scale: 150.0,
        }
    }
}

impl Default for CityConfig {
    fn default() -> Self {
        Self {
            world: WorldParams::default(),
            main: RoadClassParams::main_roads(),
            minor: RoadClassParams::minor_roads(),
            backbone: BackboneParams::default(),
            river: RiverParams::default(),
            regions: RegionParams::default(),
        }
    }
}

impl CityConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: CityConfig = serde_json::from_str(json).map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> String {
        // a plain struct of numbers and bools always serializes
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Domain of the main layer before backbone scaling.
    pub fn backbone_domain(&self) -> (u32, u32) {
        let factor = self.backbone.scale_factor.max(1);
        (self.world.width / factor, self.world.height / factor)
    }

    /// Check every parameter for values the generators cannot work with.
    pub fn validate(&self) -> Result<()> {
        let (width, height) = (self.world.width, self.world.height);
        if width < MIN_DOMAIN_SIZE || height < MIN_DOMAIN_SIZE {
            return Err(CityError::InvalidDomain { width, height });
        }
        positive("world", "noise_scale", self.world.noise_scale)?;
        nonzero("world", "max_growth_attempts", self.world.max_growth_attempts)?;

        self.main.validate("main")?;
        self.minor.validate("minor")?;

        nonzero("backbone", "scale_factor", self.backbone.scale_factor as usize)?;
        nonzero("backbone", "subdivide_count", self.backbone.subdivide_count as usize)?;
        let factor = self.backbone.scale_factor;
        if width % factor != 0 || height % factor != 0 {
            return Err(CityError::config(
                "backbone.scale_factor",
                format!("{} does not divide the {}x{} world", factor, width, height),
            ));
        }
        let (bw, bh) = self.backbone_domain();
        if bw < MIN_DOMAIN_SIZE || bh < MIN_DOMAIN_SIZE {
            return Err(CityError::InvalidDomain { width: bw, height: bh });
        }

        let river = &self.river;
        positive("river", "scan_angle", river.scan_angle)?;
        positive("river", "scan_range_scale", river.scan_range_scale)?;
        positive("river", "density_scale", river.density_scale)?;
        positive("river", "jitter_step", river.jitter_step)?;
        nonzero("river", "sample_count", river.sample_count)?;
        nonzero("river", "max_attempts", river.max_attempts)?;
        nonzero("river", "interpolation_scale", river.interpolation_scale)?;
        nonzero("river", "max_walk_steps", river.max_walk_steps)?;

        let regions = &self.regions;
        nonzero("regions", "point_count", regions.point_count)?;
        nonzero("regions", "growth_neighbours", regions.growth_neighbours)?;
        positive("regions", "commercial_scale", regions.commercial_scale)?;
        positive("regions", "density_scale", regions.density_scale)?;

        Ok(())
    }
}

fn positive(section: &str, key: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(CityError::config(
            format!("{}.{}", section, key),
            format!("must be a positive number, got {}", value),
        ))
    }
}

fn nonzero(section: &str, key: &str, value: usize) -> Result<()> {
    if value > 0 {
        Ok(())
    } else {
        Err(CityError::config(format!("{}.{}", section, key), "must be at least 1"))
    }
}

/// Name the offending key when serde reports one (e.g. "missing field `width`").
fn config_error(err: serde_json::Error) -> CityError {
    let message = err.to_string();
    let key = message
        .split('`')
        .nth(1)
        .map(str::to_string)
        .unwrap_or_else(|| "<document>".to_string());
    CityError::ConfigKey {
        key,
        reason: message,
    }
}
