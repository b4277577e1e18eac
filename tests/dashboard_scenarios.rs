//! End-to-end presenter behavior against a scripted provider

mod common;

use std::sync::Arc;
use std::time::Duration;

use aqi_dashboard::dashboard::{MarkerState, ZipQueryOutcome};
use aqi_dashboard::config::DashboardSettings;
use aqi_dashboard::{AqiCategory, ErrorKind, ProviderFailure};
use chrono::{Days, NaiveDate};
use common::{Scripted, ScriptedProvider, city, session_with, session_with_settings, three_cities};

fn standard_provider() -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::new(&[
        ("90001", Scripted::Aqi(42)),
        ("95814", Scripted::Aqi(88)),
        ("93701", Scripted::Aqi(155)),
    ]))
}

#[tokio::test]
async fn test_three_city_map_categories() {
    let session = session_with(three_cities(), standard_provider(), true);

    let map = session.render_map().await;

    let categories: Vec<Option<AqiCategory>> = map
        .markers
        .iter()
        .map(|m| m.reading().map(|r| r.category))
        .collect();
    assert_eq!(
        categories,
        vec![
            Some(AqiCategory::Good),
            Some(AqiCategory::Moderate),
            Some(AqiCategory::Unhealthy),
        ]
    );
    let names: Vec<&str> = map.markers.iter().map(|m| m.city.name.as_str()).collect();
    assert_eq!(names, vec!["Los Angeles", "Sacramento", "Fresno"]);
    assert_eq!(map.markers[0].color(), "#00e400");
    assert_eq!(map.unavailable_count(), 0);
}

#[tokio::test]
async fn test_one_failing_city_does_not_abort_the_map() {
    let provider = Arc::new(ScriptedProvider::new(&[
        ("90001", Scripted::Aqi(42)),
        ("95814", Scripted::Fail(ProviderFailure::Timeout)),
        ("93701", Scripted::Aqi(155)),
        ("94102", Scripted::Aqi(30)),
    ]));
    let mut catalog = three_cities();
    catalog.push(city("San Francisco", "94102", 37.7793, -122.4193));
    let session = session_with(catalog, provider, true);

    let map = session.render_map().await;

    assert_eq!(map.markers.len(), 4);
    assert_eq!(map.unavailable_count(), 1);
    assert!(matches!(
        map.markers[1].state,
        MarkerState::Unavailable {
            kind: ErrorKind::Provider,
            ..
        }
    ));
    assert_eq!(map.markers[1].color(), aqi_dashboard::dashboard::UNAVAILABLE_COLOR);
    assert!(map.markers[3].reading().is_some());

    let tally = map.tally();
    assert_eq!(tally[0], (AqiCategory::Good, 2));
    assert_eq!(tally[3], (AqiCategory::Unhealthy, 1));
}

#[tokio::test]
async fn test_unknown_zip_reports_no_data_and_leaves_map_alone() {
    let provider = standard_provider();
    let session = session_with(three_cities(), provider.clone(), true);

    let before = session.render_map().await;
    let outcome = session.query_zip("00000").await;
    let after = session.render_map().await;

    match outcome {
        ZipQueryOutcome::Failed {
            kind,
            message,
            retryable,
        } => {
            assert_eq!(kind, ErrorKind::NotFound);
            assert!(message.contains("No data available"));
            assert!(!retryable);
        }
        ZipQueryOutcome::Reading { .. } => panic!("00000 has no station"),
    }
    assert_eq!(before.markers.len(), after.markers.len());
    assert_eq!(after.unavailable_count(), 0);
}

#[tokio::test]
async fn test_malformed_zip_is_rejected_without_a_provider_call() {
    let provider = standard_provider();
    let session = session_with(three_cities(), provider.clone(), true);

    let outcome = session.query_zip("ABCDE").await;

    assert!(matches!(
        outcome,
        ZipQueryOutcome::Failed {
            kind: ErrorKind::InvalidInput,
            ..
        }
    ));
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn test_repeated_lookups_call_the_provider_once() {
    let provider = standard_provider();
    let session = session_with(three_cities(), provider.clone(), true);

    session.render_map().await;
    session.render_map().await;
    let outcome = session.query_zip(" 90001 ").await;

    assert!(matches!(outcome, ZipQueryOutcome::Reading { .. }));
    assert_eq!(provider.calls_for("90001"), 1);
    assert_eq!(provider.calls_for("95814"), 1);
    assert_eq!(provider.total_calls(), 3);

    session.refresh().await;
    session.render_map().await;
    assert_eq!(provider.calls_for("90001"), 2);
}

#[tokio::test]
async fn test_map_without_credential_renders_every_marker_unavailable() {
    let provider = standard_provider();
    let session = session_with(three_cities(), provider.clone(), false);

    let map = session.render_map().await;

    assert_eq!(map.unavailable_count(), 3);
    assert_eq!(provider.total_calls(), 0);

    session.set_credential("  TESTKEY-1234  ").await.unwrap();
    let map = session.render_map().await;
    assert_eq!(map.unavailable_count(), 0);
}

#[tokio::test]
async fn test_invalid_credential_is_rejected() {
    let session = session_with(three_cities(), standard_provider(), false);

    let err = session.set_credential("short").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(!session.has_credential().await);
}

#[tokio::test]
async fn test_trend_renders_failed_days_as_gaps() {
    let today = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();
    let bad_day = today.checked_sub_days(Days::new(3)).unwrap();
    let provider = Arc::new(
        ScriptedProvider::new(&[("93701", Scripted::Aqi(120))]).failing_on(bad_day),
    );
    let session = session_with(three_cities(), provider, true);

    let trend = session.trend_ending("93701", today).await.unwrap();

    assert_eq!(trend.points.len(), 7);
    assert_eq!(
        trend.points.first().map(|p| p.date),
        NaiveDate::from_ymd_opt(2024, 8, 3)
    );
    assert_eq!(
        trend.points.last().map(|p| p.date),
        NaiveDate::from_ymd_opt(2024, 8, 9)
    );
    assert_eq!(trend.gaps(), 1);
    let gap = trend.points.iter().find(|p| p.date == bad_day).unwrap();
    assert_eq!(gap.value, None);
    assert_eq!(trend.max_value(), Some(120));
    assert_eq!(trend.reporting_area.as_deref(), Some("Test Area"));
}

#[tokio::test]
async fn test_trend_fails_when_no_day_resolves() {
    let provider = Arc::new(ScriptedProvider::new(&[]));
    let session = session_with(three_cities(), provider, true);
    let today = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();

    let err = session.trend_ending("00000", today).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_trend_rejects_malformed_zip() {
    let provider = standard_provider();
    let session = session_with(three_cities(), provider.clone(), true);
    let today = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();

    let err = session.trend_ending("9000", today).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(provider.total_calls(), 0);
}

#[tokio::test]
async fn test_map_and_trend_share_the_lookup_bound() {
    let provider = Arc::new(
        ScriptedProvider::new(&[
            ("90001", Scripted::Aqi(42)),
            ("95814", Scripted::Aqi(88)),
            ("93701", Scripted::Aqi(155)),
            ("94102", Scripted::Aqi(30)),
        ])
        .with_delay(Duration::from_millis(20)),
    );
    let mut catalog = three_cities();
    catalog.push(city("San Francisco", "94102", 37.7793, -122.4193));
    let settings = DashboardSettings {
        max_concurrent_lookups: 2,
        ..DashboardSettings::default()
    };
    let session = session_with_settings(catalog, provider.clone(), true, settings);
    let today = NaiveDate::from_ymd_opt(2024, 8, 10).unwrap();

    let (map, trend) = tokio::join!(session.render_map(), session.trend_ending("93701", today));

    assert_eq!(map.unavailable_count(), 0);
    assert_eq!(trend.unwrap().points.len(), 7);
    assert_eq!(provider.historical_calls(), 7);
    assert!(provider.peak_in_flight() <= 2);
}

#[tokio::test]
async fn test_missing_credential_marks_markers_as_provider_failures() {
    let session = session_with(three_cities(), standard_provider(), false);

    let map = session.render_map().await;

    assert!(map.markers.iter().all(|m| matches!(
        m.state,
        MarkerState::Unavailable {
            kind: ErrorKind::Provider,
            ..
        }
    )));
}
