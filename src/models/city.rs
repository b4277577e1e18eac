//! Catalog city model

use serde::{Deserialize, Serialize};

use super::ZipCode;

/// One row of the bundled city catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub name: String,
    pub zip: ZipCode,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
}

impl CityRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, zip: ZipCode, latitude: f64, longitude: f64) -> Self {
        Self {
            name: name.into(),
            zip,
            latitude,
            longitude,
        }
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}
