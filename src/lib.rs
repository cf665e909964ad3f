//! spoofwatch -- AIS trajectory analysis for vessel spoofing.
//!
//! Flags vessels whose identifier appears to be shared by two craft
//! (identity spoofing) or whose reported positions jump faster than the
//! vessel can move (location spoofing). The per-vessel engine lives in
//! [`analysis`]; the rest of the crate is ingest, sinks, storage, and the
//! CLI/HTTP surfaces around it.

pub mod analysis;
pub mod api;
pub mod batch;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod model;
pub mod report;
pub mod sink;
pub mod storage;

pub use analysis::{Detector, VesselReport};
pub use model::{ClassificationResult, ClusterLabel, InvalidInputError, OutlierRecord, PositionRecord, Trajectory};

use anyhow::Result;

/// Start the HTTP API.
pub async fn serve(bind: &str, config: config::DetectorConfig) -> Result<()> {
    let addr: std::net::SocketAddr = bind.parse()?;
    let app = api::router(api::state::AppState::new(config));

    tracing::info!(%addr, "spoofwatch listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
