//! Dashboard Presenter
//!
//! Drives the user-facing flows: the catalog map rendered on page load,
//! single ZIP queries, and the historical trend chart. Every failure is
//! contained to the marker or result area it belongs to.

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, instrument, warn};

use crate::config::DashboardSettings;
use crate::error::ErrorKind;
use crate::lookup::AqiLookupService;
use crate::models::{AqiCategory, AqiReading, CityRecord, LookupInput};
use crate::provider::ApiKey;
use crate::{AqiError, Result};

pub mod trend;

pub use trend::{TrendPoint, TrendView};

/// Map center and zoom showing all of California
pub const MAP_CENTER: (f64, f64) = (36.7783, -119.4179);
pub const MAP_ZOOM: u8 = 6;

/// Marker color when no reading is available
pub const UNAVAILABLE_COLOR: &str = "#9e9e9e";

/// Outcome of one city's lookup
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MarkerState {
    Loaded { reading: AqiReading },
    Unavailable { kind: ErrorKind, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct CityMarker {
    pub city: CityRecord,
    #[serde(flatten)]
    pub state: MarkerState,
}

impl CityMarker {
    #[must_use]
    pub fn reading(&self) -> Option<&AqiReading> {
        match &self.state {
            MarkerState::Loaded { reading } => Some(reading),
            MarkerState::Unavailable { .. } => None,
        }
    }

    #[must_use]
    pub fn color(&self) -> &'static str {
        self.reading()
            .map_or(UNAVAILABLE_COLOR, |r| r.category.color())
    }

    #[must_use]
    pub fn label(&self) -> String {
        match &self.state {
            MarkerState::Loaded { reading } => format!(
                "{}: AQI {} ({})",
                self.city.name,
                reading.value,
                reading.category.label()
            ),
            MarkerState::Unavailable { reason, .. } => {
                format!("{}: unavailable ({reason})", self.city.name)
            }
        }
    }
}

/// Everything the map needs to draw one render cycle
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub markers: Vec<CityMarker>,
}

impl MapView {
    /// Number of loaded markers per category, in severity order
    #[must_use]
    pub fn tally(&self) -> Vec<(AqiCategory, usize)> {
        AqiCategory::ALL
            .iter()
            .map(|category| {
                let count = self
                    .markers
                    .iter()
                    .filter(|m| m.reading().is_some_and(|r| r.category == *category))
                    .count();
                (*category, count)
            })
            .collect()
    }

    #[must_use]
    pub fn unavailable_count(&self) -> usize {
        self.markers.iter().filter(|m| m.reading().is_none()).count()
    }
}

/// Result area of a single ZIP query
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ZipQueryOutcome {
    Reading {
        reading: AqiReading,
    },
    Failed {
        kind: ErrorKind,
        message: String,
        retryable: bool,
    },
}

impl From<&AqiError> for ZipQueryOutcome {
    fn from(err: &AqiError) -> Self {
        ZipQueryOutcome::Failed {
            kind: err.kind(),
            message: err.user_message(),
            retryable: err.is_retryable(),
        }
    }
}

/// State of one dashboard session: the catalog, the lookup service with
/// its memoization table, and the credential the user entered.
pub struct DashboardSession {
    catalog: Vec<CityRecord>,
    lookup: AqiLookupService,
    credential: RwLock<Option<ApiKey>>,
    settings: DashboardSettings,
    /// Bounds provider calls across map renders and trends
    permits: Semaphore,
}

impl DashboardSession {
    #[must_use]
    pub fn new(
        catalog: Vec<CityRecord>,
        lookup: AqiLookupService,
        settings: DashboardSettings,
        credential: Option<ApiKey>,
    ) -> Self {
        let permits = Semaphore::new(settings.max_concurrent_lookups.max(1) as usize);
        Self {
            catalog,
            lookup,
            credential: RwLock::new(credential),
            settings,
            permits,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> &[CityRecord] {
        &self.catalog
    }

    pub fn lookup_service(&self) -> &AqiLookupService {
        &self.lookup
    }

    /// Validate and store the API key entered by the user
    pub async fn set_credential(&self, raw: &str) -> Result<()> {
        let key = ApiKey::parse(raw)?;
        info!("API key updated ({:?})", key);
        *self.credential.write().await = Some(key);
        Ok(())
    }

    pub async fn has_credential(&self) -> bool {
        self.credential.read().await.is_some()
    }

    async fn credential(&self) -> Option<ApiKey> {
        self.credential.read().await.clone()
    }

    /// Resolve AQI for every catalog city. Lookups run concurrently up to
    /// the configured limit; markers keep catalog order.
    #[instrument(skip(self), fields(cities = self.catalog.len()))]
    pub async fn render_map(&self) -> MapView {
        let credential = self.credential().await;

        let markers = join_all(self.catalog.iter().map(|city| {
            let credential = credential.as_ref();
            async move {
                let _permit = self.permits.acquire().await.ok();
                let input = LookupInput::from(city.zip.clone());
                let state = match self.lookup.lookup(&input, credential).await {
                    Ok(reading) => MarkerState::Loaded { reading },
                    Err(err) => {
                        warn!("AQI unavailable for {} ({}): {}", city.name, city.zip, err);
                        MarkerState::Unavailable {
                            kind: err.kind(),
                            reason: err.user_message(),
                        }
                    }
                };
                CityMarker {
                    city: city.clone(),
                    state,
                }
            }
        }))
        .await;

        let view = MapView {
            center: MAP_CENTER,
            zoom: MAP_ZOOM,
            markers,
        };
        info!(
            "Rendered {} markers ({} unavailable)",
            view.markers.len(),
            view.unavailable_count()
        );
        view
    }

    /// Look up a user-entered ZIP code
    #[instrument(skip(self))]
    pub async fn query_zip(&self, raw: &str) -> ZipQueryOutcome {
        let credential = self.credential().await;
        match self.lookup.lookup_zip(raw.trim(), credential.as_ref()).await {
            Ok(reading) => ZipQueryOutcome::Reading { reading },
            Err(err) => {
                warn!("ZIP query for '{}' failed: {}", raw, err);
                ZipQueryOutcome::from(&err)
            }
        }
    }

    /// Look up a ZIP code or coordinate pair, propagating failures
    pub async fn lookup(&self, input: &LookupInput) -> Result<AqiReading> {
        let credential = self.credential().await;
        self.lookup.lookup(input, credential.as_ref()).await
    }

    /// Forget memoized readings so the next render fetches fresh data
    pub async fn refresh(&self) {
        self.lookup.clear().await;
    }
}
