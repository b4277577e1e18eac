//! Location inputs accepted by the lookup service

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{AqiError, Result};

/// Bounding box for the continental US, the area the provider covers.
const NORTH: f64 = 49.3931;
const SOUTH: f64 = 24.545874;
const EAST: f64 = -66.95;
const WEST: f64 = -124.75;

/// A well-formed five digit U.S. ZIP code
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZipCode(String);

impl ZipCode {
    /// Parse a ZIP code. The input must be exactly five ASCII digits.
    pub fn parse(input: &str) -> Result<Self> {
        let length = input.chars().count();
        if length != 5 {
            return Err(AqiError::invalid_input(format!(
                "ZIP code must be exactly 5 digits, got {length} characters"
            )));
        }
        if !input.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AqiError::invalid_input(format!(
                "ZIP code must contain only digits, got '{input}'"
            )));
        }
        Ok(Self(input.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ZipCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Latitude/longitude pair inside the continental US
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(AqiError::invalid_input("Coordinates must be finite numbers"));
        }
        if !(SOUTH..=NORTH).contains(&latitude) {
            return Err(AqiError::invalid_input(format!(
                "Latitude must be between {SOUTH} and {NORTH}, got: {latitude}"
            )));
        }
        if !(WEST..=EAST).contains(&longitude) {
            return Err(AqiError::invalid_input(format!(
                "Longitude must be between {WEST} and {EAST}, got: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Round coordinates for cache key generation
    #[must_use]
    pub fn rounded(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(4));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What a lookup is keyed on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LookupInput {
    Zip { zip: ZipCode },
    Coordinates { coordinates: Coordinates },
}

impl LookupInput {
    /// Parse free-form input: a ZIP code, or coordinates like
    /// "34.05,-118.24" or "34.05 -118.24".
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() == 2 {
            let lat = parts[0].parse::<f64>().map_err(|_| {
                AqiError::invalid_input(format!("Invalid latitude: {}", parts[0]))
            })?;
            let lon = parts[1].parse::<f64>().map_err(|_| {
                AqiError::invalid_input(format!("Invalid longitude: {}", parts[1]))
            })?;
            return Ok(Coordinates::new(lat, lon)?.into());
        }

        Ok(ZipCode::parse(input)?.into())
    }

    /// Stable key for memoization
    #[must_use]
    pub fn cache_key(&self) -> String {
        match self {
            LookupInput::Zip { zip } => format!("aqi:zip:{zip}"),
            LookupInput::Coordinates { coordinates } => {
                let (lat, lon) = coordinates.rounded(4);
                format!("aqi:coord:{lat:.4}:{lon:.4}")
            }
        }
    }
}

impl From<ZipCode> for LookupInput {
    fn from(zip: ZipCode) -> Self {
        LookupInput::Zip { zip }
    }
}

impl From<Coordinates> for LookupInput {
    fn from(coordinates: Coordinates) -> Self {
        LookupInput::Coordinates { coordinates }
    }
}

impl fmt::Display for LookupInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupInput::Zip { zip } => write!(f, "ZIP {zip}"),
            LookupInput::Coordinates { coordinates } => write!(f, "({coordinates})"),
        }
    }
}
