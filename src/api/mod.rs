use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State, rejection::QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::dashboard::{CityMarker, DashboardSession, TrendView};
use crate::error::{ErrorKind, ProviderFailure};
use crate::models::{AqiReading, CityRecord, Coordinates, LookupInput, ZipCode};
use crate::{AqiError, VERSION};

#[derive(Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorKind,
    pub message: String,
    pub retryable: bool,
}

#[derive(Serialize, Deserialize)]
pub struct ApiHealth {
    pub status: String,
    pub version: String,
    pub cities: usize,
    pub has_credential: bool,
    pub memoized: usize,
}

#[derive(Deserialize)]
pub struct CoordinateQuery {
    pub lat: f64,
    pub lon: f64,
}

fn status_for(err: &AqiError) -> StatusCode {
    match err {
        AqiError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        AqiError::NotFound { .. } => StatusCode::NOT_FOUND,
        AqiError::Provider { kind, .. } => match kind {
            ProviderFailure::MissingCredential
            | ProviderFailure::RateLimited
            | ProviderFailure::Timeout
            | ProviderFailure::Network => StatusCode::SERVICE_UNAVAILABLE,
            ProviderFailure::Unauthorized
            | ProviderFailure::InvalidResponse
            | ProviderFailure::Status(_) => StatusCode::BAD_GATEWAY,
        },
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AqiError {
    fn into_response(self) -> Response {
        let status = status_for(&self);
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        let body = Json(ApiError {
            error: self.kind(),
            message: self.user_message(),
            retryable: self.is_retryable(),
        });
        (status, body).into_response()
    }
}

pub fn router() -> Router<Arc<DashboardSession>> {
    Router::new()
        .route("/cities", get(get_cities))
        .route("/markers", get(get_markers))
        .route("/aqi", get(get_aqi_by_coordinates))
        .route("/aqi/{zip}", get(get_aqi_by_zip))
        .route("/trend/{zip}", get(get_trend))
        .route("/health", get(get_health))
}

async fn get_cities(State(session): State<Arc<DashboardSession>>) -> Json<Vec<CityRecord>> {
    Json(session.catalog().to_vec())
}

async fn get_markers(State(session): State<Arc<DashboardSession>>) -> Json<Vec<CityMarker>> {
    Json(session.render_map().await.markers)
}

async fn get_aqi_by_zip(
    State(session): State<Arc<DashboardSession>>,
    Path(zip): Path<String>,
) -> Result<Json<AqiReading>, AqiError> {
    let input = LookupInput::from(ZipCode::parse(&zip)?);
    Ok(Json(session.lookup(&input).await?))
}

async fn get_aqi_by_coordinates(
    State(session): State<Arc<DashboardSession>>,
    query: Result<Query<CoordinateQuery>, QueryRejection>,
) -> Result<Json<AqiReading>, AqiError> {
    let Query(query) = query.map_err(|rejection| AqiError::invalid_input(rejection.body_text()))?;
    let input = LookupInput::from(Coordinates::new(query.lat, query.lon)?);
    Ok(Json(session.lookup(&input).await?))
}

async fn get_trend(
    State(session): State<Arc<DashboardSession>>,
    Path(zip): Path<String>,
) -> Result<Json<TrendView>, AqiError> {
    Ok(Json(session.trend(&zip).await?))
}

async fn get_health(State(session): State<Arc<DashboardSession>>) -> Json<ApiHealth> {
    Json(ApiHealth {
        status: "ok".to_string(),
        version: VERSION.to_string(),
        cities: session.catalog().len(),
        has_credential: session.has_credential().await,
        memoized: session.lookup_service().memoized_count().await,
    })
}
