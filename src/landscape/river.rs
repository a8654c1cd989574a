//! River placement: a noise-guided walk from a domain edge that keeps stepping
//! towards the lowest nearby terrain until it leaves the map, smoothed with an
//! Akima spline.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::RiverParams;
use crate::error::CityError;
use crate::geometry::Point;
use crate::noise_field::{NoiseField, NoiseRandom};
use crate::seeds::{attempt_seed, derive_seed, CitySeeds};

use super::spline::AkimaSpline;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct River {
    /// Raw walk, ending with the first point outside the domain
    points: Vec<Point>,
    /// Spline-resampled curve through `points`
    interpolated: Vec<Point>,
    attempts: usize,
    /// No attempt met the validity criteria
    exhausted: bool,
}

/// A single random walk.
#[derive(Clone, Debug)]
pub(crate) struct Walk {
    pub points: Vec<Point>,
    /// False when the step ceiling was hit before the walk left the domain
    pub left_domain: bool,
}

impl River {
    /// Place a river on a `width` x `height` domain.
    ///
    /// Each attempt uses fresh terrain and jitter fields; after
    /// `params.max_attempts` failures the last walk is kept and the shortfall
    /// is recorded instead of failing.
    pub fn generate(width: f64, height: f64, noise_scale: f64, params: &RiverParams, seeds: &CitySeeds) -> River {
        let mut rng = CitySeeds::rng(derive_seed(seeds.river, "placement"));
        let scan_range = noise_scale * params.scan_range_scale;
        let max_attempts = params.max_attempts.max(1);

        let mut points = Vec::new();
        let mut attempts = 0;
        let mut valid = false;

        while attempts < max_attempts {
            let terrain = NoiseField::new(attempt_seed(seeds.river, attempts), params.density_scale);
            let mut jitter = NoiseRandom::new(attempt_seed(seeds.river_jitter, attempts), params.jitter_step);
            attempts += 1;

            let walk = walk(width, height, scan_range, params, &terrain, &mut jitter, &mut rng);
            valid = walk.left_domain && is_valid(&walk.points, width, height, params.min_points);
            log::debug!(
                "River attempt {}: {} points, valid: {}",
                attempts,
                walk.points.len(),
                valid
            );
            points = walk.points;

            if valid {
                break;
            }
        }

        if valid {
            log::info!("River placed after {} attempts with {} points", attempts, points.len());
        } else {
            log::warn!(
                "Aborted river generation after {} attempts, settling with {} points",
                attempts,
                points.len()
            );
        }

        let interpolated = interpolate(&points, params.interpolation_scale);

        River {
            points,
            interpolated,
            attempts,
            exhausted: !valid,
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn interpolated(&self) -> &[Point] {
        &self.interpolated
    }

    /// Consecutive pairs of interpolated points, for drawing the river as a polyline.
    pub fn interpolated_segments(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        self.interpolated.windows(2).map(|w| (w[0], w[1]))
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// `GenerationExhausted` if the attempt budget ran out before a valid river was found.
    pub fn shortfall(&self) -> Option<CityError> {
        self.exhausted.then_some(CityError::GenerationExhausted {
            stage: "river",
            attempts: self.attempts,
        })
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    /// A random raw point from the middle half of the river.
    pub fn central_point(&self, rng: &mut ChaCha8Rng) -> Option<Point> {
        let n = self.points.len();
        match n {
            0 => None,
            1 => Some(self.points[0]),
            _ => {
                let index = rng.gen_range(0..n / 2) + n / 4;
                self.points.get(index).copied()
            }
        }
    }
}

/// The river must cross most of the map: its ends must be at least the smaller
/// domain side apart.
fn is_valid(points: &[Point], width: f64, height: f64, min_points: usize) -> bool {
    if points.len() < min_points.max(2) {
        return false;
    }
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return false;
    };
    let min_dim = width.min(height);
    first.distance_sq(last) >= min_dim * min_dim
}

/// Random point on one of the four domain edges and the inward direction (radians).
fn river_source(width: f64, height: f64, rng: &mut ChaCha8Rng) -> (Point, f64) {
    let x = rng.gen::<f64>() * width;
    let y = rng.gen::<f64>() * height;

    match rng.gen_range(0..4) {
        // top
        0 => (Point::new(x, 0.0), std::f64::consts::FRAC_PI_2),
        // left
        1 => (Point::new(0.0, y), 0.0),
        // bottom
        2 => (Point::new(x, height), -std::f64::consts::FRAC_PI_2),
        // right
        _ => (Point::new(width, y), std::f64::consts::PI),
    }
}

/// Walk from a random edge, each step moving to the lowest-terrain sample in a
/// cone around the current heading, until the walk leaves the domain or
/// `params.max_walk_steps` is reached.
pub(crate) fn walk(
    width: f64,
    height: f64,
    scan_range: f64,
    params: &RiverParams,
    terrain: &NoiseField,
    jitter: &mut NoiseRandom,
    rng: &mut ChaCha8Rng,
) -> Walk {
    let (mut position, mut heading) = river_source(width, height, rng);
    let in_domain = |p: &Point| p.x >= 0.0 && p.y >= 0.0 && p.x < width && p.y < height;

    let mut points = Vec::new();
    for _ in 0..params.max_walk_steps {
        points.push(position);

        let mut best = position;
        let mut min_density = f64::MAX;
        for _ in 0..params.sample_count {
            let angle = heading + jitter.next_value() * params.scan_angle * 2.0 - params.scan_angle;
            let check = position.offset(angle, scan_range);
            let value = terrain.value(check.x, check.y);
            if value < min_density {
                min_density = value;
                best = check;
            }
        }

        heading = position.angle_to(&best);
        position = best;

        if !in_domain(&position) {
            points.push(position);
            return Walk {
                points,
                left_domain: true,
            };
        }
    }

    Walk {
        points,
        left_domain: false,
    }
}

/// Resample `points` with an Akima spline per coordinate, parameterised by
/// `index * scale`, at `scale` sub-steps per segment. The last raw point closes
/// the curve.
fn interpolate(points: &[Point], scale: usize) -> Vec<Point> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let scale = scale.max(1);
    let indices: Vec<f64> = (0..points.len()).map(|i| (i * scale) as f64).collect();
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();

    let (Some(spline_x), Some(spline_y)) = (AkimaSpline::new(&indices, &xs), AkimaSpline::new(&indices, &ys)) else {
        return points.to_vec();
    };

    let mut interpolated = Vec::with_capacity((points.len() - 1) * scale + 1);
    for index in indices.iter().take(points.len() - 1) {
        for j in 0..scale {
            let t = index + j as f64;
            interpolated.push(Point::new(spline_x.value(t), spline_y.value(t)));
        }
    }
    if let Some(&last) = points.last() {
        interpolated.push(last);
    }

    interpolated
}
