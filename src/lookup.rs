//! AQI Lookup Service
//!
//! Validates lookup inputs, resolves them through an [`AqiProvider`] and
//! memoizes the readings for the lifetime of the session.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::{debug, info, instrument};

use crate::cache::{MemoCache, MemoKey};
use crate::config::CacheConfig;
use crate::error::ProviderFailure;
use crate::models::{AqiReading, LookupInput, ZipCode};
use crate::provider::{ApiKey, AqiProvider};
use crate::{AqiError, Result};

/// Past days never change, so they can be kept much longer.
const HISTORICAL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

pub struct AqiLookupService {
    provider: Arc<dyn AqiProvider>,
    memo: MemoCache<AqiReading>,
    current_ttl: Duration,
}

impl AqiLookupService {
    #[must_use]
    pub fn new(provider: Arc<dyn AqiProvider>, cache: &CacheConfig) -> Self {
        Self {
            provider,
            memo: MemoCache::new(),
            current_ttl: Duration::from_secs(u64::from(cache.ttl_minutes) * 60),
        }
    }

    /// Validate a raw ZIP code and look it up. Malformed input is rejected
    /// before any provider call.
    pub async fn lookup_zip(&self, raw: &str, credential: Option<&ApiKey>) -> Result<AqiReading> {
        let zip = ZipCode::parse(raw)?;
        self.lookup(&zip.into(), credential).await
    }

    /// Current AQI for a ZIP code or coordinate pair
    #[instrument(skip(self, credential), fields(input = %input))]
    pub async fn lookup(
        &self,
        input: &LookupInput,
        credential: Option<&ApiKey>,
    ) -> Result<AqiReading> {
        let credential = require_credential(credential)?;
        let key = MemoKey::current(input.cache_key());

        let reading = self
            .memo
            .get_or_try_insert_with(key, self.current_ttl, || async {
                let observations = self.provider.current(input, credential).await?;
                AqiReading::from_observations(input.clone(), observations)
                    .ok_or_else(|| AqiError::not_found(input.to_string()))
            })
            .await?;

        info!(
            "AQI for {} is {} ({})",
            input,
            reading.value,
            reading.category.label()
        );
        Ok(reading)
    }

    /// Daily AQI for a past date
    #[instrument(skip(self, credential), fields(input = %input, date = %date))]
    pub async fn lookup_historical(
        &self,
        input: &LookupInput,
        date: NaiveDate,
        credential: Option<&ApiKey>,
    ) -> Result<AqiReading> {
        let credential = require_credential(credential)?;
        let key = MemoKey::historical(input.cache_key(), date);
        let ttl = if date < Local::now().date_naive() {
            HISTORICAL_TTL
        } else {
            self.current_ttl
        };

        self.memo
            .get_or_try_insert_with(key, ttl, || async {
                let observations = self.provider.historical(input, date, credential).await?;
                AqiReading::from_observations(input.clone(), observations)
                    .ok_or_else(|| AqiError::not_found(format!("{input} on {date}")))
            })
            .await
    }

    /// Forget every memoized reading
    pub async fn clear(&self) {
        debug!("Clearing memoized readings");
        self.memo.clear().await;
    }

    pub async fn memoized_count(&self) -> usize {
        self.memo.len().await
    }
}

/// A missing key is a provider failure the user can recover from by
/// entering one.
pub(crate) fn require_credential(credential: Option<&ApiKey>) -> Result<&ApiKey> {
    credential.ok_or_else(|| {
        AqiError::provider(
            ProviderFailure::MissingCredential,
            "An AirNow API key is required",
        )
    })
}
