use maud::{Markup, html};

use crate::dashboard::TrendView;

const WIDTH: f64 = 600.0;
const HEIGHT: f64 = 220.0;
const AXIS_HEIGHT: f64 = 20.0;
const BAR_GAP: f64 = 6.0;

/// Scale never drops below the top of the Unhealthy for Sensitive Groups band
const MIN_SCALE: u32 = 150;

/// Daily AQI bars colored by category. Days without data are drawn as
/// dashed outlines.
pub fn trend_chart(view: &TrendView) -> Markup {
    let scale = f64::from(view.max_value().unwrap_or(0).max(MIN_SCALE));
    let plot_height = HEIGHT - AXIS_HEIGHT;
    let slot = WIDTH / view.points.len().max(1) as f64;
    let bar_width = (slot - BAR_GAP).max(1.0);

    html! {
        figure {
            svg xmlns="http://www.w3.org/2000/svg" class="aqi-trend"
                viewBox=(format!("0 0 {WIDTH} {HEIGHT}")) width="100%" role="img" {
                title { "Daily AQI for ZIP " (view.zip) }
                @for (index, point) in view.points.iter().enumerate() {
                    @let x = index as f64 * slot + BAR_GAP / 2.0;
                    @let label_x = x + bar_width / 2.0;
                    @match (point.value, point.category) {
                        (Some(value), Some(category)) => {
                            @let bar_height = (f64::from(value) / scale * plot_height).max(1.0);
                            rect x=(format!("{x:.1}")) y=(format!("{:.1}", plot_height - bar_height))
                                width=(format!("{bar_width:.1}")) height=(format!("{bar_height:.1}"))
                                fill=(category.color()) {
                                title { (point.date) ": AQI " (value) " (" (category.label()) ")" }
                            }
                            text x=(format!("{label_x:.1}")) y=(format!("{:.1}", (plot_height - bar_height - 4.0).max(12.0)))
                                text-anchor="middle" font-size="11" { (value) }
                        }
                        _ => {
                            rect x=(format!("{x:.1}")) y=(format!("{:.1}", plot_height - 12.0))
                                width=(format!("{bar_width:.1}")) height="12"
                                fill="none" stroke="#9e9e9e" stroke-dasharray="3 2" {
                                title { (point.date) ": no data" }
                            }
                        }
                    }
                    text x=(format!("{label_x:.1}")) y=(format!("{:.1}", HEIGHT - 4.0))
                        text-anchor="middle" font-size="10" { (point.date.format("%m-%d")) }
                }
            }
            figcaption class="help" {
                @if let Some(area) = &view.reporting_area {
                    (area) " · "
                }
                @match view.average() {
                    Some(average) => { "average AQI " (format!("{average:.0}")) }
                    None => { "no readings" }
                }
                @if view.gaps() > 0 {
                    " · " (view.gaps()) " day(s) without data"
                }
            }
        }
    }
}
