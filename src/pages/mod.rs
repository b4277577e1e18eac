//! Server-rendered HTML for the single-page dashboard

use maud::{DOCTYPE, Markup, html};

use crate::dashboard::{MapView, TrendView, ZipQueryOutcome};
use crate::AqiError;

mod chart;
mod components;

pub use chart::trend_chart;
pub use components::{
    catalog_table, credential_form, legend, map_section, trend_result, trend_section,
    zip_section,
};

/// Outcome served by the trend fragment route
pub enum TrendSection {
    Ready(TrendView),
    Failed(AqiError),
}

/// Everything one page render needs
pub struct DashboardPage {
    pub map: MapView,
    pub has_credential: bool,
    pub credential_error: Option<String>,
    pub zip_query: Option<(String, ZipQueryOutcome)>,
    /// ZIP whose trend the page should load after rendering
    pub trend: Option<String>,
}

pub fn base(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                link rel="stylesheet" href="https://cdn.jsdelivr.net/npm/bulma@1.0.2/css/bulma.min.css";
                link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css";
                script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js" {}
            }
            body {
                section class="section pt-4" {
                    div class="container" {
                        (content)
                    }
                }
            }
        }
    }
}

pub fn dashboard_page(page: &DashboardPage) -> Markup {
    let content = html! {
        h1 class="title" { "California Cities AQI Map" }
        p class="subtitle is-6" {
            "This map shows the AQI (Air Quality Index) values of major cities in California along with their categories."
        }

        (credential_form(page.has_credential, page.credential_error.as_deref()))

        div class="columns" {
            div class="column is-two-thirds" {
                (map_section(&page.map))
            }
            div class="column" {
                (legend(&page.map))
                form method="post" action="/refresh" {
                    button class="button is-small is-light" type="submit" { "Refresh readings" }
                }
            }
        }

        (zip_section(page.zip_query.as_ref()))
        (trend_section(page.trend.as_deref()))

        details class="box mt-5" {
            summary { "See data table" }
            (catalog_table(&page.map))
        }
    };
    base("California AQI Dashboard", content)
}
