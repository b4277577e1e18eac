use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Form, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tracing::{info, warn};

use crate::api;
use crate::config::ServerConfig;
use crate::dashboard::DashboardSession;
use crate::pages::{self, DashboardPage, TrendSection};
use crate::AqiError;

/// Upper bound for one request, including a full map render
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub zip: Option<String>,
    pub trend: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub zip: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CredentialForm {
    pub api_key: String,
}

pub fn router(session: Arc<DashboardSession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index))
        .route("/trend", get(trend_fragment))
        .route("/credential", post(save_credential))
        .route("/refresh", post(refresh))
        .nest("/api", api::router())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ))
        .layer(cors)
        .with_state(session)
}

pub async fn run(config: &ServerConfig, session: Arc<DashboardSession>) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Dashboard running at http://{}", addr);

    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server stopped unexpectedly")?;
    info!("Web server shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

/// Blank form fields count as "not requested"
fn requested(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn build_page(
    session: &DashboardSession,
    query: PageQuery,
    credential_error: Option<String>,
) -> DashboardPage {
    let zip = requested(query.zip);
    let trend = requested(query.trend);

    let (map, zip_query, has_credential) = tokio::join!(
        session.render_map(),
        async {
            match zip {
                Some(zip) => {
                    let outcome = session.query_zip(&zip).await;
                    Some((zip, outcome))
                }
                None => None,
            }
        },
        session.has_credential(),
    );

    DashboardPage {
        map,
        has_credential,
        credential_error,
        zip_query,
        trend,
    }
}

async fn index(
    State(session): State<Arc<DashboardSession>>,
    Query(query): Query<PageQuery>,
) -> Html<String> {
    let page = build_page(&session, query, None).await;
    Html(pages::dashboard_page(&page).into_string())
}

async fn trend_fragment(
    State(session): State<Arc<DashboardSession>>,
    Query(query): Query<TrendQuery>,
) -> Html<String> {
    let section = match requested(query.zip) {
        Some(zip) => match session.trend(&zip).await {
            Ok(view) => TrendSection::Ready(view),
            Err(error) => TrendSection::Failed(error),
        },
        None => {
            TrendSection::Failed(AqiError::invalid_input("Enter a ZIP code to see its trend"))
        }
    };
    Html(pages::trend_result(&section).into_string())
}

async fn save_credential(
    State(session): State<Arc<DashboardSession>>,
    Form(form): Form<CredentialForm>,
) -> Response {
    match session.set_credential(&form.api_key).await {
        Ok(()) => Redirect::to("/").into_response(),
        Err(err) => {
            warn!("Rejected API key: {}", err);
            let page = build_page(&session, PageQuery::default(), Some(err.user_message())).await;
            (
                StatusCode::BAD_REQUEST,
                Html(pages::dashboard_page(&page).into_string()),
            )
                .into_response()
        }
    }
}

async fn refresh(State(session): State<Arc<DashboardSession>>) -> Redirect {
    session.refresh().await;
    Redirect::to("/")
}
