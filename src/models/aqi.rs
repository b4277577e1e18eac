//! AQI categories and readings

use std::ops::RangeInclusive;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::LookupInput;

/// EPA AQI severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    pub const ALL: [AqiCategory; 6] = [
        AqiCategory::Good,
        AqiCategory::Moderate,
        AqiCategory::UnhealthySensitive,
        AqiCategory::Unhealthy,
        AqiCategory::VeryUnhealthy,
        AqiCategory::Hazardous,
    ];

    /// Map an AQI value to its category. Total over all non-negative values.
    #[must_use]
    pub fn from_value(value: u32) -> Self {
        match value {
            0..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthySensitive,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    /// Values covered by this category. Hazardous is open-ended.
    #[must_use]
    pub fn range(&self) -> RangeInclusive<u32> {
        match self {
            AqiCategory::Good => 0..=50,
            AqiCategory::Moderate => 51..=100,
            AqiCategory::UnhealthySensitive => 101..=150,
            AqiCategory::Unhealthy => 151..=200,
            AqiCategory::VeryUnhealthy => 201..=300,
            AqiCategory::Hazardous => 301..=u32::MAX,
        }
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    /// Standard EPA display color
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            AqiCategory::Good => "#00e400",
            AqiCategory::Moderate => "#ffff00",
            AqiCategory::UnhealthySensitive => "#ff7e00",
            AqiCategory::Unhealthy => "#ff0000",
            AqiCategory::VeryUnhealthy => "#8f3f97",
            AqiCategory::Hazardous => "#7e0023",
        }
    }
}

/// One pollutant's AQI at a reporting area
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantObservation {
    /// Pollutant name as the provider spells it (PM2.5, O3, PM10)
    pub parameter: String,
    pub aqi: u32,
    pub reporting_area: String,
    pub state_code: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Local observation date
    pub date: NaiveDate,
    /// Local observation hour, when the provider reports one
    pub hour: Option<u8>,
    /// Provider's time zone abbreviation (PST, PDT, ...)
    pub time_zone: Option<String>,
}

/// Resolved AQI for one lookup input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AqiReading {
    /// Highest AQI across reported pollutants
    pub value: u32,
    pub category: AqiCategory,
    pub location: LookupInput,
    pub reporting_area: String,
    pub state_code: String,
    /// Pollutant that determined `value`
    pub primary_pollutant: String,
    /// When the reading was resolved
    pub retrieved_at: DateTime<Utc>,
    pub observed_on: NaiveDate,
    pub observed_hour: Option<u8>,
    pub pollutants: Vec<PollutantObservation>,
}

impl AqiReading {
    /// Collapse per-pollutant observations into a single reading.
    /// Returns `None` when there are no observations.
    #[must_use]
    pub fn from_observations(
        location: LookupInput,
        observations: Vec<PollutantObservation>,
    ) -> Option<Self> {
        let primary = observations.iter().max_by_key(|o| o.aqi)?.clone();
        Some(Self {
            value: primary.aqi,
            category: AqiCategory::from_value(primary.aqi),
            location,
            reporting_area: primary.reporting_area,
            state_code: primary.state_code,
            primary_pollutant: primary.parameter,
            retrieved_at: Utc::now(),
            observed_on: primary.date,
            observed_hour: primary.hour,
            pollutants: observations,
        })
    }

    /// AQI for one pollutant, e.g. `"PM2.5"`
    #[must_use]
    pub fn pollutant(&self, parameter: &str) -> Option<u32> {
        self.pollutants
            .iter()
            .find(|o| o.parameter.eq_ignore_ascii_case(parameter))
            .map(|o| o.aqi)
    }
}
