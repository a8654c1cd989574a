//! Seed management for city generation
//!
//! Provides separate seeds for each generation system, so that every noise field
//! and random stream in a run is reproducible and independent of the others.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Seeds for all city generation systems.
///
/// Each system gets its own seed, derived from a master seed by default.
/// Individual seeds can be overridden for experimentation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CitySeeds {
    /// Master seed (used for display/reference)
    pub master: u64,
    /// Terrain density field that bends road angles
    pub density: u64,
    /// Road growth gates (road chance draws)
    pub roads: u64,
    /// River seed placement and per-attempt density fields
    pub river: u64,
    /// River scan-angle jitter stream
    pub river_jitter: u64,
    /// Voronoi site placement, seed distribution, growth and morph rolls
    pub regions: u64,
    /// Region commercialisation axis
    pub commercial: u64,
    /// Region residential density axis
    pub residential: u64,
}

impl CitySeeds {
    /// Create seeds from a master seed, deriving all sub-seeds deterministically.
    pub fn from_master(master: u64) -> Self {
        Self {
            master,
            density: derive_seed(master, "density"),
            roads: derive_seed(master, "roads"),
            river: derive_seed(master, "river"),
            river_jitter: derive_seed(master, "river_jitter"),
            regions: derive_seed(master, "regions"),
            commercial: derive_seed(master, "commercial"),
            residential: derive_seed(master, "residential"),
        }
    }

    /// Create a builder for customizing individual seeds
    pub fn builder(master: u64) -> CitySeedsBuilder {
        CitySeedsBuilder::new(master)
    }

    /// Fresh RNG for a subsystem seed.
    pub fn rng(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }
}

impl Default for CitySeeds {
    fn default() -> Self {
        Self::from_master(rand::random())
    }
}

/// Builder for customizing individual seeds while deriving others from master
pub struct CitySeedsBuilder {
    seeds: CitySeeds,
}

impl CitySeedsBuilder {
    pub fn new(master: u64) -> Self {
        Self {
            seeds: CitySeeds::from_master(master),
        }
    }

    pub fn density(mut self, seed: u64) -> Self {
        self.seeds.density = seed;
        self
    }

    pub fn roads(mut self, seed: u64) -> Self {
        self.seeds.roads = seed;
        self
    }

    pub fn river(mut self, seed: u64) -> Self {
        self.seeds.river = seed;
        self
    }

    pub fn river_jitter(mut self, seed: u64) -> Self {
        self.seeds.river_jitter = seed;
        self
    }

    pub fn regions(mut self, seed: u64) -> Self {
        self.seeds.regions = seed;
        self
    }

    pub fn commercial(mut self, seed: u64) -> Self {
        self.seeds.commercial = seed;
        self
    }

    pub fn residential(mut self, seed: u64) -> Self {
        self.seeds.residential = seed;
        self
    }

    pub fn build(self) -> CitySeeds {
        self.seeds
    }
}

/// Derive a sub-seed from a parent seed and a name.
/// Uses hashing to ensure different systems get different but deterministic seeds.
pub fn derive_seed(master: u64, system: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    master.hash(&mut hasher);
    system.hash(&mut hasher);
    hasher.finish()
}

/// Derive the seed of the n-th retry of a subsystem.
pub fn attempt_seed(seed: u64, attempt: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    seed.hash(&mut hasher);
    attempt.hash(&mut hasher);
    hasher.finish()
}

/// Noise libraries take 32-bit seeds.
pub fn noise_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

impl std::fmt::Display for CitySeeds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CitySeeds {{ master: {}, density: {}, roads: {}, river: {}, river_jitter: {}, \
             regions: {}, commercial: {}, residential: {} }}",
            self.master,
            self.density,
            self.roads,
            self.river,
            self.river_jitter,
            self.regions,
            self.commercial,
            self.residential,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_derivation() {
        let seeds1 = CitySeeds::from_master(12345);
        let seeds2 = CitySeeds::from_master(12345);

        assert_eq!(seeds1, seeds2);
    }

    #[test]
    fn test_different_systems_get_different_seeds() {
        let seeds = CitySeeds::from_master(12345);

        assert_ne!(seeds.density, seeds.roads);
        assert_ne!(seeds.river, seeds.river_jitter);
        assert_ne!(seeds.commercial, seeds.residential);
    }

    #[test]
    fn test_builder_override() {
        let seeds = CitySeeds::builder(12345).river(99999).build();

        assert_eq!(seeds.river, 99999);

        let default_seeds = CitySeeds::from_master(12345);
        assert_eq!(seeds.roads, default_seeds.roads);
        assert_eq!(seeds.regions, default_seeds.regions);
    }

    #[test]
    fn test_attempt_seeds_differ() {
        assert_ne!(attempt_seed(7, 0), attempt_seed(7, 1));
        assert_eq!(attempt_seed(7, 3), attempt_seed(7, 3));
    }
}
