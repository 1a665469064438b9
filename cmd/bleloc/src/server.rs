//! HTTP adapter over the [`Locator`].
//!
//! API endpoints:
//! - POST   /api/collect          - store a labeled sample
//! - POST   /api/predict          - k-NN region prediction
//! - POST   /api/locate           - prediction by the configured strategy
//! - GET    /api/reload           - reload the fingerprint table
//! - GET    /api/health           - table size
//! - POST   /api/addData          - one frame of a profile visit
//! - GET    /api/medianData       - all stored profiles
//! - GET    /api/medianData/{key} - one stored profile
//! - DELETE /api/medianData/{key} - delete a stored profile
//! - POST   /api/match            - rank regions against stored profiles

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use bleloc_fingerprint::{BeaconReading, SampleMeta};
use bleloc_locator::{Health, Locator, LocatorError};
use bleloc_similarity::Metric;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

type AppState = Arc<Locator>;

#[derive(Debug, Deserialize)]
struct CollectRequest {
    #[serde(flatten)]
    meta: SampleMeta,
    #[serde(default)]
    beacons: Vec<BeaconReading>,
}

#[derive(Debug, Deserialize)]
struct BeaconsRequest {
    #[serde(default)]
    beacons: Vec<BeaconReading>,
}

#[derive(Debug, Deserialize)]
struct MatchRequest {
    #[serde(default)]
    beacons: Vec<BeaconReading>,
    #[serde(default)]
    metric: Option<String>,
}

/// One frame of a profile visit: `count` is the frame's sequence number.
#[derive(Debug, Deserialize)]
struct AddDataRequest {
    #[serde(default)]
    dto: Vec<BeaconReading>,
    count: u32,
    regional: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectResponse {
    ok: bool,
    saved: usize,
    beacon_cols: usize,
}

#[derive(Debug, Serialize)]
struct ReloadResponse {
    ok: bool,
    #[serde(flatten)]
    health: Health,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(flatten)]
    health: Health,
}

#[derive(Debug, Serialize)]
struct AddDataResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
}

#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<LocatorError> for ApiError {
    fn from(e: LocatorError) -> Self {
        if e.is_validation() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

/// Malformed bodies (bad JSON or wrong field types) are client errors.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::Internal(m) => {
                error!("server: {m}");
                (StatusCode::INTERNAL_SERVER_ERROR, m)
            }
        };
        (status, Json(json!({ "ok": false, "message": message }))).into_response()
    }
}

/// Runs a locator call off the async workers; the stores do blocking I/O.
async fn blocking<T, F>(locator: &AppState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&Locator) -> Result<T, LocatorError> + Send + 'static,
{
    let locator = locator.clone();
    tokio::task::spawn_blocking(move || f(&locator))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(ApiError::from)
}

/// Builds the API router.
pub fn router(locator: AppState) -> Router {
    Router::new()
        .route("/api/collect", post(collect))
        .route("/api/predict", post(predict))
        .route("/api/locate", post(locate))
        .route("/api/reload", get(reload))
        .route("/api/health", get(health))
        .route("/api/addData", post(add_data))
        .route("/api/medianData", get(list_profiles))
        .route("/api/medianData/{key}", get(get_profile).delete(delete_profile))
        .route("/api/match", post(match_profiles))
        .layer(CorsLayer::permissive())
        .with_state(locator)
}

/// Start the HTTP server.
pub async fn start_server(addr: &str, locator: Locator) -> Result<()> {
    let app = router(Arc::new(locator));
    let addr = parse_addr(addr)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("server: listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("server: shutting down");
        })
        .await?;
    Ok(())
}

/// Parse address string to SocketAddr.
fn parse_addr(addr: &str) -> Result<SocketAddr> {
    let addr = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };
    Ok(addr.parse()?)
}

async fn collect(
    State(locator): State<AppState>,
    payload: Result<Json<CollectRequest>, JsonRejection>,
) -> Result<Json<CollectResponse>, ApiError> {
    let Json(req) = payload?;
    let out = blocking(&locator, move |l| l.collect(req.meta, &req.beacons)).await?;
    Ok(Json(CollectResponse {
        ok: true,
        saved: 1,
        beacon_cols: out.column_count,
    }))
}

async fn predict(
    State(locator): State<AppState>,
    payload: Result<Json<BeaconsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    Ok(Json(locator.predict(&req.beacons)?))
}

async fn locate(
    State(locator): State<AppState>,
    payload: Result<Json<BeaconsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let ranking = blocking(&locator, move |l| l.locate(&req.beacons)).await?;
    Ok(Json(ranking))
}

async fn reload(State(locator): State<AppState>) -> Result<Json<ReloadResponse>, ApiError> {
    let health = blocking(&locator, |l| l.reload()).await?;
    Ok(Json(ReloadResponse { ok: true, health }))
}

async fn health(State(locator): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "UP",
        health: locator.health(),
    })
}

async fn add_data(
    State(locator): State<AppState>,
    payload: Result<Json<AddDataRequest>, JsonRejection>,
) -> Result<Json<AddDataResponse>, ApiError> {
    let Json(req) = payload?;
    let out = blocking(&locator, move |l| {
        l.add_profile_frame(req.count, &req.regional, req.dto)
    })
    .await?;
    Ok(Json(AddDataResponse {
        ok: true,
        key: out.map(|o| o.key),
    }))
}

async fn list_profiles(State(locator): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let doc = blocking(&locator, |l| Ok(l.profiles())).await?;
    Ok(Json(doc))
}

async fn get_profile(
    State(locator): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = key.clone();
    match blocking(&locator, move |l| Ok(l.profile(&lookup))).await? {
        Some(p) => Ok(Json(p)),
        None => Err(ApiError::NotFound(format!("profile '{key}' not found"))),
    }
}

async fn delete_profile(
    State(locator): State<AppState>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lookup = key.clone();
    let deleted = blocking(&locator, move |l| l.delete_profile(&lookup)).await?;
    Ok(Json(json!({ "ok": true, "key": key, "deleted": deleted })))
}

async fn match_profiles(
    State(locator): State<AppState>,
    payload: Result<Json<MatchRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let metric = req
        .metric
        .as_deref()
        .map(str::parse::<Metric>)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let ranking = blocking(&locator, move |l| l.match_profiles(&req.beacons, metric)).await?;
    Ok(Json(ranking))
}
