//! `aqi-dashboard` - Air quality dashboard for California cities
//!
//! This library loads the bundled city catalog, resolves current and
//! historical AQI readings from AirNow, and renders them as a color-coded
//! map, single ZIP lookups, and a daily trend chart.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod lookup;
pub mod models;
pub mod pages;
pub mod provider;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use cache::{MemoCache, MemoKey};
pub use catalog::CityCatalog;
pub use config::DashboardConfig;
pub use dashboard::{DashboardSession, MapView, ZipQueryOutcome};
pub use error::{AqiError, ErrorKind, ProviderFailure};
pub use lookup::AqiLookupService;
pub use models::{AqiCategory, AqiReading, CityRecord, Coordinates, LookupInput, ZipCode};
pub use provider::{AirNowClient, ApiKey, AqiProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, AqiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
