//! Air quality data providers
//!
//! The dashboard talks to its data source through [`AqiProvider`] so the
//! lookup service can be exercised without network access.

use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{LookupInput, PollutantObservation};
use crate::{AqiError, Result};

pub mod airnow;

pub use airnow::AirNowClient;

/// Provider credential. Never printed in full.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn parse(input: &str) -> Result<Self> {
        let key = input.trim();
        if key.is_empty() {
            return Err(AqiError::invalid_input("API key cannot be empty"));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(AqiError::invalid_input("API key cannot contain whitespace"));
        }
        if key.len() < 8 {
            return Err(AqiError::invalid_input(
                "API key appears to be invalid (too short)",
            ));
        }
        if key.len() > 100 {
            return Err(AqiError::invalid_input(
                "API key appears to be invalid (too long)",
            ));
        }
        Ok(Self(key.to_string()))
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tail: String = self.0.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        write!(f, "ApiKey(****{tail})")
    }
}

/// A source of AQI observations.
///
/// An empty observation list means the provider has no station near the
/// location; implementations must not turn that into an error themselves.
#[async_trait]
pub trait AqiProvider: Send + Sync {
    /// Latest hourly observations for a location
    async fn current(
        &self,
        input: &LookupInput,
        credential: &ApiKey,
    ) -> Result<Vec<PollutantObservation>>;

    /// Daily observations for a past date
    async fn historical(
        &self,
        input: &LookupInput,
        date: NaiveDate,
        credential: &ApiKey,
    ) -> Result<Vec<PollutantObservation>>;
}
