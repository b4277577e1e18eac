use maud::{Markup, PreEscaped, html};
use serde::Serialize;

use super::{TrendSection, trend_chart};
use crate::dashboard::{CityMarker, MapView, ZipQueryOutcome};
use crate::error::ErrorKind;
use crate::models::{AqiCategory, AqiReading};

/// Marker payload handed to the Leaflet script
#[derive(Serialize)]
struct MapMarker<'a> {
    lat: f64,
    lon: f64,
    color: &'a str,
    popup: String,
}

impl<'a> From<&'a CityMarker> for MapMarker<'a> {
    fn from(marker: &'a CityMarker) -> Self {
        Self {
            lat: marker.city.latitude,
            lon: marker.city.longitude,
            color: marker.color(),
            popup: marker_popup(marker).into_string(),
        }
    }
}

fn marker_popup(marker: &CityMarker) -> Markup {
    html! {
        b { "City: " (marker.city.name) }
        br;
        @match marker.reading() {
            Some(reading) => {
                "AQI: " (reading.value)
                br;
                "Category: " (reading.category.label())
                br;
                "PM2.5: " (pm25_text(reading))
            }
            None => {
                "AQI unavailable"
            }
        }
    }
}

fn pm25_text(reading: &AqiReading) -> String {
    reading
        .pollutant("PM2.5")
        .map_or_else(|| "n/a".to_string(), |value| value.to_string())
}

/// JSON suitable for embedding in a `<script>` element
fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
}

pub fn map_section(map: &MapView) -> Markup {
    let markers: Vec<MapMarker<'_>> = map.markers.iter().map(MapMarker::from).collect();
    let script = format!(
        r#"(function () {{
  var map = L.map('aqi-map').setView([{lat}, {lon}], {zoom});
  L.tileLayer('https://{{s}}.tile.openstreetmap.org/{{z}}/{{x}}/{{y}}.png', {{
    attribution: '&copy; OpenStreetMap contributors'
  }}).addTo(map);
  {markers}.forEach(function (m) {{
    L.circleMarker([m.lat, m.lon], {{
      radius: 10, color: m.color, fillColor: m.color, fillOpacity: 0.7
    }}).bindPopup(m.popup).addTo(map);
  }});
}})();"#,
        lat = map.center.0,
        lon = map.center.1,
        zoom = map.zoom,
        markers = script_json(&markers),
    );

    html! {
        div class="box" {
            div id="aqi-map" style="height: 520px;" {}
            script { (PreEscaped(script)) }
        }
    }
}

pub fn legend(map: &MapView) -> Markup {
    let unavailable = map.unavailable_count();
    html! {
        div class="box" {
            h4 class="title is-5" { "AQI Categories" }
            table class="table is-narrow is-fullwidth" {
                tbody {
                    @for (category, count) in map.tally() {
                        tr {
                            td { (swatch(category.color())) }
                            td { (category.label()) }
                            td class="has-text-grey" { (range_text(category)) }
                            td class="has-text-right" { (count) }
                        }
                    }
                }
            }
            @if unavailable > 0 {
                p class="help is-warning" {
                    (unavailable) " of " (map.markers.len()) " cities have no reading right now."
                }
            }
        }
    }
}

fn range_text(category: AqiCategory) -> String {
    let range = category.range();
    if *range.end() == u32::MAX {
        format!("{}+", range.start())
    } else {
        format!("{}-{}", range.start(), range.end())
    }
}

fn swatch(color: &str) -> Markup {
    html! {
        span style=(format!(
            "display:inline-block;width:14px;height:14px;border-radius:50%;background:{color};"
        )) {}
    }
}

pub fn credential_form(has_credential: bool, error: Option<&str>) -> Markup {
    html! {
        form class="box" method="post" action="/credential" {
            label class="label" for="api_key" { "AirNow API Key" }
            div class="field has-addons" {
                div class="control is-expanded" {
                    input class=(if error.is_some() { "input is-danger" } else { "input" })
                        type="password" id="api_key" name="api_key"
                        placeholder="Enter your AirNow API key" autocomplete="off";
                }
                div class="control" {
                    button class="button is-link" type="submit" { "Save" }
                }
            }
            @if let Some(error) = error {
                p class="help is-danger" { (error) }
            } @else if has_credential {
                p class="help is-success" { "API key set for this session." }
            } @else {
                p class="help" { "Markers stay grey until a key is entered." }
            }
        }
    }
}

pub fn zip_section(query: Option<&(String, ZipQueryOutcome)>) -> Markup {
    html! {
        div class="box" {
            h4 class="title is-5" { "Look up a ZIP code" }
            form method="get" action="/" {
                div class="field has-addons" {
                    div class="control" {
                        input class="input" type="text" name="zip" maxlength="5"
                            placeholder="Enter a ZIP code"
                            value=(query.map(|(zip, _)| zip.as_str()).unwrap_or_default());
                    }
                    div class="control" {
                        button class="button is-info" type="submit" { "Get AQI" }
                    }
                }
            }
            @if let Some((zip, outcome)) = query {
                div id="zip-result" class="mt-4" {
                    (zip_result(zip, outcome))
                }
            }
        }
    }
}

fn zip_result(zip: &str, outcome: &ZipQueryOutcome) -> Markup {
    match outcome {
        ZipQueryOutcome::Reading { reading } => html! {
            div class="notification is-light" {
                p class="is-size-5" {
                    (swatch(reading.category.color()))
                    " AQI " strong { (reading.value) } " - " (reading.category.label())
                }
                p {
                    (reading.reporting_area) ", " (reading.state_code)
                    " · primary pollutant " (reading.primary_pollutant)
                    " · PM2.5 " (pm25_text(reading))
                }
                p class="help" { "Observed " (reading.observed_on) }
            }
        },
        ZipQueryOutcome::Failed {
            kind,
            message,
            retryable,
        } => html! {
            div class=(if *kind == ErrorKind::NotFound { "notification is-warning" } else { "notification is-danger" }) {
                (message)
                @if *retryable {
                    " "
                    a href=(format!("/?zip={}", urlencoding::encode(zip))) { "Retry" }
                }
            }
        },
    }
}

/// Fills every `data-src` placeholder with the HTML fragment it points at
const FRAGMENT_LOADER: &str = r#"document.querySelectorAll('[data-src]').forEach(function (el) {
  fetch(el.dataset.src)
    .then(function (r) { return r.text(); })
    .then(function (html) { el.innerHTML = html; })
    .catch(function () { el.textContent = 'Could not load the trend.'; });
});"#;

/// Trend form. A requested ZIP gets a placeholder that loads `/trend`
/// after the page is shown.
pub fn trend_section(requested: Option<&str>) -> Markup {
    html! {
        div class="box" {
            h4 class="title is-5" { "AQI trend" }
            form method="get" action="/" {
                div class="field has-addons" {
                    div class="control" {
                        input class="input" type="text" name="trend" maxlength="5"
                            placeholder="Enter a ZIP code" value=(requested.unwrap_or_default());
                    }
                    div class="control" {
                        button class="button is-info" type="submit" { "Show trend" }
                    }
                }
            }
            @if let Some(zip) = requested {
                div id="trend-result" class="mt-4"
                    data-src=(format!("/trend?zip={}", urlencoding::encode(zip))) {
                    progress class="progress is-small is-info" max="100" {}
                    p class="has-text-grey" { "Loading trend for ZIP " (zip) "..." }
                }
                script { (PreEscaped(FRAGMENT_LOADER)) }
            }
        }
    }
}

/// Body of the trend placeholder
pub fn trend_result(trend: &TrendSection) -> Markup {
    html! {
        @match trend {
            TrendSection::Ready(view) => { (trend_chart(view)) }
            TrendSection::Failed(error) => {
                div class="notification is-danger" { (error.user_message()) }
            }
        }
    }
}

pub fn catalog_table(map: &MapView) -> Markup {
    html! {
        div class="table-container" {
            table class="table is-fullwidth is-striped is-hoverable" {
                thead {
                    tr {
                        th { "City" }
                        th { "ZIP" }
                        th { "Coordinates" }
                        th { "AQI" }
                        th { "Category" }
                    }
                }
                tbody {
                    @for marker in &map.markers {
                        tr {
                            td { (marker.city.name) }
                            td { (marker.city.zip) }
                            td { (marker.city.format_coordinates()) }
                            @match marker.reading() {
                                Some(reading) => {
                                    td { (reading.value) }
                                    td { (swatch(reading.category.color())) " " (reading.category.label()) }
                                }
                                None => {
                                    td class="has-text-grey" { "-" }
                                    td class="has-text-grey" { "Unavailable" }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_json_escapes_closing_tags() {
        let json = script_json(&vec!["</script><b>"]);
        assert!(!json.contains("</"));
        assert!(json.contains("<\\/script>"));
    }

    #[test]
    fn test_range_text() {
        assert_eq!(range_text(AqiCategory::Good), "0-50");
        assert_eq!(range_text(AqiCategory::Hazardous), "301+");
    }

    #[test]
    fn test_credential_error_is_inline() {
        let html = credential_form(false, Some("API key is too short")).into_string();
        assert!(html.contains("is-danger"));
        assert!(html.contains("API key is too short"));
    }

    #[test]
    fn test_retry_link_only_for_retryable_failures() {
        let retryable = ZipQueryOutcome::Failed {
            kind: ErrorKind::Provider,
            message: "AirNow is unavailable".to_string(),
            retryable: true,
        };
        let html = zip_result("90001", &retryable).into_string();
        assert!(html.contains("/?zip=90001"));

        let not_found = ZipQueryOutcome::Failed {
            kind: ErrorKind::NotFound,
            message: "No data available for ZIP 00000.".to_string(),
            retryable: false,
        };
        let html = zip_result("00000", &not_found).into_string();
        assert!(html.contains("No data available"));
        assert!(!html.contains("Retry"));
    }

    #[test]
    fn test_trend_section_defers_the_chart() {
        let html = trend_section(Some("93701")).into_string();
        assert!(html.contains("data-src=\"/trend?zip=93701\""));
        assert!(!html.contains("<svg"));

        let html = trend_section(None).into_string();
        assert!(!html.contains("trend-result"));
    }

    #[test]
    fn test_trend_failure_is_a_notification() {
        let failed =
            TrendSection::Failed(crate::AqiError::invalid_input("ZIP code must be 5 digits"));
        let html = trend_result(&failed).into_string();
        assert!(html.contains("is-danger"));
        assert!(!html.contains("<svg"));
    }
}
