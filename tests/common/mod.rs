//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aqi_dashboard::config::{CacheConfig, DashboardSettings};
use aqi_dashboard::models::PollutantObservation;
use aqi_dashboard::{
    AqiError, AqiLookupService, AqiProvider, ApiKey, CityRecord, DashboardSession, LookupInput,
    ProviderFailure, Result, ZipCode,
};
use async_trait::async_trait;
use chrono::NaiveDate;

pub const TEST_KEY: &str = "TESTKEY-1234";

/// What the scripted provider answers for one ZIP code
#[derive(Clone)]
pub enum Scripted {
    Aqi(u32),
    NoStation,
    Fail(ProviderFailure),
}

/// In-memory provider answering from a per-ZIP script and counting calls
#[derive(Default)]
pub struct ScriptedProvider {
    script: HashMap<String, Scripted>,
    failing_dates: HashSet<NaiveDate>,
    calls: Mutex<HashMap<String, usize>>,
    historical_calls: AtomicUsize,
    delay: Duration,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(script: &[(&str, Scripted)]) -> Self {
        Self {
            script: script
                .iter()
                .map(|(zip, answer)| ((*zip).to_string(), answer.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, date: NaiveDate) -> Self {
        self.failing_dates.insert(date);
        self
    }

    /// Hold every answer for `delay` so overlapping calls can be observed
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls_for(&self, zip: &str) -> usize {
        self.calls.lock().unwrap().get(zip).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn historical_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
    }

    /// Most calls that were ever in progress at the same time
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn hold(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn answer(&self, input: &LookupInput, date: NaiveDate) -> Result<Vec<PollutantObservation>> {
        let zip = match input {
            LookupInput::Zip { zip } => zip.to_string(),
            LookupInput::Coordinates { .. } => "coordinates".to_string(),
        };
        *self.calls.lock().unwrap().entry(zip.clone()).or_default() += 1;

        match self.script.get(&zip).cloned().unwrap_or(Scripted::NoStation) {
            Scripted::Aqi(aqi) => Ok(vec![
                observation("PM2.5", aqi, date),
                observation("O3", aqi / 2, date),
            ]),
            Scripted::NoStation => Ok(Vec::new()),
            Scripted::Fail(kind) => Err(AqiError::provider(kind, "scripted failure")),
        }
    }
}

pub fn observation(parameter: &str, aqi: u32, date: NaiveDate) -> PollutantObservation {
    PollutantObservation {
        parameter: parameter.to_string(),
        aqi,
        reporting_area: "Test Area".to_string(),
        state_code: "CA".to_string(),
        latitude: 36.7,
        longitude: -119.7,
        date,
        hour: Some(10),
        time_zone: Some("PST".to_string()),
    }
}

#[async_trait]
impl AqiProvider for ScriptedProvider {
    async fn current(
        &self,
        input: &LookupInput,
        _credential: &ApiKey,
    ) -> Result<Vec<PollutantObservation>> {
        self.hold().await;
        self.answer(input, NaiveDate::from_ymd_opt(2024, 8, 1).unwrap())
    }

    async fn historical(
        &self,
        input: &LookupInput,
        date: NaiveDate,
        _credential: &ApiKey,
    ) -> Result<Vec<PollutantObservation>> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        self.hold().await;
        if self.failing_dates.contains(&date) {
            return Err(AqiError::provider(ProviderFailure::Timeout, "scripted timeout"));
        }
        self.answer(input, date)
    }
}

pub fn city(name: &str, zip: &str, latitude: f64, longitude: f64) -> CityRecord {
    CityRecord::new(name, ZipCode::parse(zip).unwrap(), latitude, longitude)
}

/// Los Angeles, Sacramento and Fresno
pub fn three_cities() -> Vec<CityRecord> {
    vec![
        city("Los Angeles", "90001", 33.9731, -118.2479),
        city("Sacramento", "95814", 38.5816, -121.4944),
        city("Fresno", "93701", 36.7378, -119.7871),
    ]
}

pub fn session_with(
    catalog: Vec<CityRecord>,
    provider: Arc<ScriptedProvider>,
    with_key: bool,
) -> DashboardSession {
    session_with_settings(catalog, provider, with_key, DashboardSettings::default())
}

pub fn session_with_settings(
    catalog: Vec<CityRecord>,
    provider: Arc<ScriptedProvider>,
    with_key: bool,
    settings: DashboardSettings,
) -> DashboardSession {
    let lookup = AqiLookupService::new(provider, &CacheConfig::default());
    let credential = with_key.then(|| ApiKey::parse(TEST_KEY).unwrap());
    DashboardSession::new(catalog, lookup, settings, credential)
}
