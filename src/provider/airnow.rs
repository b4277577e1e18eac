//! AirNow observation API client
//!
//! Endpoints used (all under `https://www.airnowapi.org/aq/observation`):
//!
//! - `/zipCode/current/` and `/latLong/current/` return the latest hourly
//!   observation for each pollutant at the nearest reporting area.
//! - `/zipCode/historical/` and `/latLong/historical/` return the daily
//!   observations for a given date (`YYYY-MM-DDT00-0000`).
//!
//! Both answer with a JSON array; an empty array means no station within
//! `distance` miles. Missing historical values are reported as `AQI: -1`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

use super::{ApiKey, AqiProvider};
use crate::config::AirNowConfig;
use crate::error::ProviderFailure;
use crate::models::{LookupInput, PollutantObservation};
use crate::{AqiError, Result};

/// One element of an AirNow observation response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AirNowObservation {
    date_observed: String,
    hour_observed: Option<u8>,
    local_time_zone: Option<String>,
    reporting_area: String,
    state_code: String,
    latitude: f64,
    longitude: f64,
    parameter_name: String,
    #[serde(rename = "AQI")]
    aqi: i32,
}

impl AirNowObservation {
    /// Returns `None` for placeholder rows without a value
    fn into_observation(self) -> Result<Option<PollutantObservation>> {
        if self.aqi < 0 {
            return Ok(None);
        }
        let date = NaiveDate::parse_from_str(self.date_observed.trim(), "%Y-%m-%d").map_err(
            |e| {
                AqiError::provider(
                    ProviderFailure::InvalidResponse,
                    format!("Bad DateObserved '{}': {e}", self.date_observed),
                )
            },
        )?;
        Ok(Some(PollutantObservation {
            parameter: self.parameter_name,
            aqi: self.aqi.unsigned_abs(),
            reporting_area: self.reporting_area,
            state_code: self.state_code,
            latitude: self.latitude,
            longitude: self.longitude,
            date,
            hour: self.hour_observed,
            time_zone: self.local_time_zone,
        }))
    }
}

/// HTTP client for the AirNow API
pub struct AirNowClient {
    client: ClientWithMiddleware,
    base_url: String,
    distance_miles: u32,
}

impl AirNowClient {
    pub fn new(config: &AirNowConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.into()))
            .user_agent(concat!("aqi-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AqiError::config(format!("Failed to create HTTP client: {e}")))?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            distance_miles: config.distance_miles,
        })
    }

    fn location_query(input: &LookupInput) -> (&'static str, String) {
        match input {
            LookupInput::Zip { zip } => ("zipCode", format!("zipCode={zip}")),
            LookupInput::Coordinates { coordinates } => (
                "latLong",
                format!(
                    "latitude={:.4}&longitude={:.4}",
                    coordinates.latitude, coordinates.longitude
                ),
            ),
        }
    }

    fn current_url(&self, input: &LookupInput, credential: &ApiKey) -> String {
        let (endpoint, location) = Self::location_query(input);
        format!(
            "{}/{endpoint}/current/?format=application/json&{location}&distance={}&API_KEY={}",
            self.base_url,
            self.distance_miles,
            urlencoding::encode(credential.expose())
        )
    }

    fn historical_url(&self, input: &LookupInput, date: NaiveDate, credential: &ApiKey) -> String {
        let (endpoint, location) = Self::location_query(input);
        format!(
            "{}/{endpoint}/historical/?format=application/json&{location}&date={}T00-0000&distance={}&API_KEY={}",
            self.base_url,
            date.format("%Y-%m-%d"),
            self.distance_miles,
            urlencoding::encode(credential.expose())
        )
    }

    /// Issue a GET and decode the observation array
    async fn fetch(&self, url: &str) -> Result<Vec<PollutantObservation>> {
        let start_time = Instant::now();

        let response = self.client.get(url).send().await.map_err(|e| {
            let failure = match &e {
                reqwest_middleware::Error::Reqwest(inner) if inner.is_timeout() => {
                    ProviderFailure::Timeout
                }
                _ => ProviderFailure::Network,
            };
            // The URL carries the API key
            let message = match e {
                reqwest_middleware::Error::Reqwest(inner) => inner.without_url().to_string(),
                other => other.to_string(),
            };
            warn!("AirNow request failed: {}", message);
            AqiError::provider(failure, message)
        })?;

        let status = response.status();
        debug!(
            "AirNow responded {} in {:.3}s",
            status,
            start_time.elapsed().as_secs_f64()
        );

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => {
                    error!("AirNow rejected the API key (HTTP {})", status.as_u16());
                    AqiError::provider(
                        ProviderFailure::Unauthorized,
                        format!("AirNow rejected the API key (HTTP {})", status.as_u16()),
                    )
                }
                429 => {
                    warn!("AirNow rate limit exceeded");
                    AqiError::provider(ProviderFailure::RateLimited, "AirNow rate limit exceeded")
                }
                code => {
                    warn!("AirNow request failed with status {}", status);
                    AqiError::provider(
                        ProviderFailure::Status(code),
                        format!(
                            "AirNow request failed with status: {} - {}",
                            status,
                            status.canonical_reason().unwrap_or("Unknown error")
                        ),
                    )
                }
            });
        }

        let raw: Vec<AirNowObservation> = response.json().await.map_err(|e| {
            error!("Failed to parse AirNow response: {}", e.without_url());
            AqiError::provider(
                ProviderFailure::InvalidResponse,
                "Invalid observation data received from AirNow",
            )
        })?;

        let mut observations = Vec::with_capacity(raw.len());
        for row in raw {
            if let Some(observation) = row.into_observation()? {
                observations.push(observation);
            }
        }

        if start_time.elapsed().as_secs() > 5 {
            warn!(
                "Slow AirNow response: {:.3}s",
                start_time.elapsed().as_secs_f64()
            );
        }

        Ok(observations)
    }
}

#[async_trait]
impl AqiProvider for AirNowClient {
    #[instrument(skip(self, credential), fields(input = %input))]
    async fn current(
        &self,
        input: &LookupInput,
        credential: &ApiKey,
    ) -> Result<Vec<PollutantObservation>> {
        let observations = self.fetch(&self.current_url(input, credential)).await?;
        info!(
            "Received {} current observations for {}",
            observations.len(),
            input
        );
        Ok(observations)
    }

    #[instrument(skip(self, credential), fields(input = %input, date = %date))]
    async fn historical(
        &self,
        input: &LookupInput,
        date: NaiveDate,
        credential: &ApiKey,
    ) -> Result<Vec<PollutantObservation>> {
        let observations = self
            .fetch(&self.historical_url(input, date, credential))
            .await?;
        debug!(
            "Received {} historical observations for {} on {}",
            observations.len(),
            input,
            date
        );
        Ok(observations)
    }
}
