//! Procedural city generation library
//!
//! Grows hierarchical road networks from local expansion rules and synthesises
//! a landscape (river and typed land-use regions) from seeded noise fields.

pub mod city;
pub mod config;
pub mod error;
pub mod geometry;
pub mod landscape;
pub mod noise_field;
pub mod roads;
pub mod seeds;
pub mod spatial;

pub use city::{generate_city, City, CitySummary};
pub use config::CityConfig;
pub use error::{CityError, Result};
pub use seeds::CitySeeds;
