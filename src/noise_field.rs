//! Seeded continuous scalar fields over the plane.
//!
//! A [`NoiseField`] is the terrain/density primitive used everywhere: road angle
//! jitter, river path finding, and the region commercialisation/density axes.
//! [`NoiseRandom`] samples the same kind of field along a line to produce a
//! reproducible scalar stream.

use noise::{NoiseFn, OpenSimplex};

use crate::seeds::noise_seed;

/// Native output range of the underlying gradient noise.
const NOISE_MIN: f64 = -1.0;
const NOISE_MAX: f64 = 1.0;

/// A deterministic noise field returning values in `[0, max]`.
#[derive(Clone)]
pub struct NoiseField {
    noise: OpenSimplex,
    scale: f64,
    seed: u64,
}

impl NoiseField {
    /// `scale` is the spatial frequency divisor: larger scales give broader features.
    pub fn new(seed: u64, scale: f64) -> Self {
        Self {
            noise: OpenSimplex::new(noise_seed(seed)),
            scale,
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Field value in `[0, 1]`.
    pub fn value(&self, x: f64, y: f64) -> f64 {
        self.value_with_max(x, y, 1.0)
    }

    /// Field value linearly remapped from `[-1, 1]` to `[0, max]` and clamped to it.
    pub fn value_with_max(&self, x: f64, y: f64, max: f64) -> f64 {
        let raw = self.noise.get([x / self.scale, y / self.scale]);
        remap_clamped(raw, max)
    }
}

impl std::fmt::Debug for NoiseField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoiseField")
            .field("seed", &self.seed)
            .field("scale", &self.scale)
            .finish()
    }
}

fn remap_clamped(raw: f64, max: f64) -> f64 {
    let value = (raw - NOISE_MIN) / (NOISE_MAX - NOISE_MIN) * max;
    value.clamp(0.0, max)
}

/// A pseudo-random stream in `[0, 1]` read off a noise field along the x axis.
///
/// Each call advances the sampling index by `step`; the stream is fully
/// determined by the seed and step.
#[derive(Clone)]
pub struct NoiseRandom {
    noise: OpenSimplex,
    step: f64,
    index: f64,
}

impl NoiseRandom {
    pub const DEFAULT_STEP: f64 = 0.5;

    pub fn new(seed: u64, step: f64) -> Self {
        Self {
            noise: OpenSimplex::new(noise_seed(seed)),
            step,
            index: 0.0,
        }
    }

    pub fn next_value(&mut self) -> f64 {
        self.index += self.step;
        remap_clamped(self.noise.get([self.index, 0.0]), 1.0)
    }
}
