//! Data models for the AQI dashboard
//!
//! - Location: ZIP codes, coordinates and lookup inputs
//! - AQI: categories, per-pollutant observations and resolved readings
//! - City: rows of the bundled city catalog

pub mod aqi;
pub mod city;
pub mod location;

pub use aqi::{AqiCategory, AqiReading, PollutantObservation};
pub use city::CityRecord;
pub use location::{Coordinates, LookupInput, ZipCode};
