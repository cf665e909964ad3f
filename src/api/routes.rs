//! API route definitions.

use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::state::AppState;
use crate::batch::classify_fleet;
use crate::model::{PositionRecord, Trajectory};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/classify", post(classify))
        .route("/outliers/{vessel_id}", get(outliers))
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub records: Vec<RecordInput>,
}

#[derive(Debug, Deserialize)]
pub struct RecordInput {
    pub identifier: String,
    pub timestamp: DateTime<Utc>,
    pub lon: f64,
    pub lat: f64,
    pub sog: f64,
}

type ApiError = (StatusCode, Json<Value>);

fn error(status: StatusCode, message: impl ToString) -> ApiError {
    (status, Json(json!({ "error": { "message": message.to_string() } })))
}

async fn health() -> Json<Value> {
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION")
        },
        "meta": {
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "version": env!("CARGO_PKG_VERSION")
        }
    }))
}

async fn classify(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "rejected classify request body");
        error(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    let mut grouped: BTreeMap<String, Vec<PositionRecord>> = BTreeMap::new();
    for r in req.records {
        grouped
            .entry(r.identifier)
            .or_default()
            .push(PositionRecord::new(r.timestamp, r.lon, r.lat, r.sog));
    }

    let mut trajectories = BTreeMap::new();
    for (id, positions) in grouped {
        let trajectory = Trajectory::new(id.clone(), positions).map_err(|e| {
            warn!(error = %e, "rejected classify request");
            error(StatusCode::BAD_REQUEST, e)
        })?;
        trajectories.insert(id, trajectory);
    }

    let detector = state.detector.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        classify_fleet(&trajectories, &detector, 0, &AtomicBool::new(false))
    })
    .await
    .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, e))?
    .map_err(|e| error(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))?;

    info!(vessels = outcome.results.len(), flagged = outcome.flagged, "classify request served");

    let data: Vec<Value> = outcome
        .results
        .iter()
        .map(|(id, r)| {
            json!({
                "identifier": id,
                "has_problem": r.has_problem,
                "has_location_spoofing": r.has_location_spoofing,
                "has_identity_spoofing": r.has_identity_spoofing,
                "cluster_count": r.cluster_count,
            })
        })
        .collect();

    Ok(Json(json!({
        "data": data,
        "meta": {
            "total": data.len(),
            "flagged": outcome.flagged,
            "skipped": outcome.skipped,
            "elapsed_ms": outcome.elapsed.as_millis() as u64,
        }
    })))
}

async fn outliers(
    State(state): State<AppState>,
    Path(vessel_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.outliers.get(&vessel_id) {
        Some(points) => Ok(Json(json!({
            "data": points,
            "meta": { "total": points.len(), "vessel_id": vessel_id }
        }))),
        None => Err(error(
            StatusCode::NOT_FOUND,
            format!("no outliers recorded for vessel {}", vessel_id),
        )),
    }
}
