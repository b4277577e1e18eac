//! Historical AQI trend for a single ZIP code

use chrono::{Days, Local, NaiveDate};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::DashboardSession;
use crate::models::{AqiCategory, LookupInput, ZipCode};
use crate::lookup::require_credential;
use crate::Result;

/// Daily AQI, or a gap when the day could not be resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub value: Option<u32>,
    pub category: Option<AqiCategory>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendView {
    pub zip: ZipCode,
    pub reporting_area: Option<String>,
    /// Oldest day first
    pub points: Vec<TrendPoint>,
}

impl TrendView {
    #[must_use]
    pub fn max_value(&self) -> Option<u32> {
        self.points.iter().filter_map(|p| p.value).max()
    }

    #[must_use]
    pub fn average(&self) -> Option<f64> {
        let values: Vec<u32> = self.points.iter().filter_map(|p| p.value).collect();
        if values.is_empty() {
            return None;
        }
        Some(f64::from(values.iter().sum::<u32>()) / values.len() as f64)
    }

    #[must_use]
    pub fn gaps(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_none()).count()
    }
}

impl DashboardSession {
    /// Daily AQI for the configured number of days before today
    pub async fn trend(&self, raw_zip: &str) -> Result<TrendView> {
        self.trend_ending(raw_zip, Local::now().date_naive()).await
    }

    /// Daily AQI for the days before `today`. A day that fails to resolve
    /// becomes a gap; the trend fails only when every day failed.
    #[instrument(skip(self))]
    pub async fn trend_ending(&self, raw_zip: &str, today: NaiveDate) -> Result<TrendView> {
        let zip = ZipCode::parse(raw_zip.trim())?;
        let input: LookupInput = zip.clone().into();
        let credential = self.credential().await;
        let credential = require_credential(credential.as_ref())?;

        let days = self.settings.trend_days.max(1);
        let dates: Vec<NaiveDate> = (1..=days)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(u64::from(offset))))
            .collect();

        let results = join_all(dates.iter().map(|date| {
            let input = &input;
            async move {
                let _permit = self.permits.acquire().await.ok();
                self.lookup
                    .lookup_historical(input, *date, Some(credential))
                    .await
            }
        }))
        .await;

        let mut first_error = None;
        let mut reporting_area = None;
        let mut points = Vec::with_capacity(dates.len());
        for (date, result) in dates.into_iter().zip(results) {
            match result {
                Ok(reading) => {
                    reporting_area.get_or_insert_with(|| reading.reporting_area.clone());
                    points.push(TrendPoint {
                        date,
                        value: Some(reading.value),
                        category: Some(reading.category),
                    });
                }
                Err(err) => {
                    warn!("No trend data for {} on {}: {}", zip, date, err);
                    first_error.get_or_insert(err);
                    points.push(TrendPoint {
                        date,
                        value: None,
                        category: None,
                    });
                }
            }
        }

        if reporting_area.is_none() {
            if let Some(err) = first_error {
                return Err(err);
            }
        }

        debug!("Trend for {} has {} points", zip, points.len());
        Ok(TrendView {
            zip,
            reporting_area,
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(day: u32, value: Option<u32>) -> TrendPoint {
        TrendPoint {
            date: NaiveDate::from_ymd_opt(2024, 8, day).unwrap(),
            value,
            category: value.map(AqiCategory::from_value),
        }
    }

    #[test]
    fn test_trend_statistics() {
        let view = TrendView {
            zip: ZipCode::parse("93701").unwrap(),
            reporting_area: Some("Fresno".to_string()),
            points: vec![point(1, Some(40)), point(2, None), point(3, Some(80))],
        };

        assert_eq!(view.max_value(), Some(80));
        assert_eq!(view.average(), Some(60.0));
        assert_eq!(view.gaps(), 1);
    }

    #[test]
    fn test_empty_trend_statistics() {
        let view = TrendView {
            zip: ZipCode::parse("93701").unwrap(),
            reporting_area: None,
            points: vec![point(1, None)],
        };

        assert_eq!(view.max_value(), None);
        assert_eq!(view.average(), None);
    }
}
