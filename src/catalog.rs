//! City Catalog Loader
//!
//! Reads the bundled list of California cities (name, ZIP code and
//! coordinates) that the dashboard plots on its map.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use crate::models::{CityRecord, ZipCode};
use crate::{AqiError, Result};

/// Raw CSV row. ZIP codes are kept as text so leading zeros survive.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    #[serde(rename = "City")]
    city: String,
    #[serde(rename = "Zipcode")]
    zip_code: String,
    #[serde(rename = "Latitude")]
    latitude: f64,
    #[serde(rename = "Longitude")]
    longitude: f64,
}

/// Service for loading the city catalog
pub struct CityCatalog;

impl CityCatalog {
    /// Load the catalog from a CSV file
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Vec<CityRecord>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            AqiError::data_load(format!("Cannot open catalog {}: {e}", path.display()))
        })?;

        let cities = Self::from_reader(file)?;
        info!("Loaded {} cities from {}", cities.len(), path.display());
        Ok(cities)
    }

    /// Parse catalog rows from any CSV source, preserving row order
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<CityRecord>> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut cities = Vec::new();
        for (index, row) in csv_reader.deserialize::<CatalogRow>().enumerate() {
            // Header is line 1
            let line = index + 2;
            let row = row.map_err(|e| {
                AqiError::data_load(format!("Malformed catalog row at line {line}: {e}"))
            })?;
            cities.push(Self::to_record(row, line)?);
        }

        if cities.is_empty() {
            return Err(AqiError::data_load("Catalog contains no cities"));
        }

        debug!("Parsed {} catalog rows", cities.len());
        Ok(cities)
    }

    fn to_record(row: CatalogRow, line: usize) -> Result<CityRecord> {
        if row.city.is_empty() {
            return Err(AqiError::data_load(format!(
                "Missing city name at line {line}"
            )));
        }

        let zip = ZipCode::parse(&row.zip_code).map_err(|e| {
            AqiError::data_load(format!("Bad ZIP code for {} at line {line}: {e}", row.city))
        })?;

        if !(-90.0..=90.0).contains(&row.latitude) || !(-180.0..=180.0).contains(&row.longitude)
        {
            return Err(AqiError::data_load(format!(
                "Coordinates out of range for {} at line {line}: {}, {}",
                row.city, row.latitude, row.longitude
            )));
        }

        Ok(CityRecord::new(row.city, zip, row.latitude, row.longitude))
    }
}
