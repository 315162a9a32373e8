//! HTTP control endpoints
//!
//! - `GET  /api/simulate`: current impairment settings
//! - `POST /api/simulate`: partial update, pushed live to data viewers
//! - `GET  /api/stats`: relay counters
//! - `GET  /broadcast-url`: URL a broadcaster should open

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Json;
use serde_json::{json, Value};

use crate::impairment::{ImpairmentConfig, ImpairmentUpdate};
use crate::stats::StatsSnapshot;

use super::listener::AppState;

/// `GET /api/simulate`
pub(crate) async fn get_simulation(State(state): State<AppState>) -> Json<ImpairmentConfig> {
    Json(state.hub.impairment().await)
}

/// `POST /api/simulate`
///
/// Never rejects: an unreadable body is an empty update, which still
/// re-announces the current settings to viewers.
pub(crate) async fn set_simulation(
    State(state): State<AppState>,
    body: Bytes,
) -> Json<ImpairmentConfig> {
    let value = serde_json::from_slice::<Value>(&body).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "Unreadable simulation update, treating as empty");
        Value::Null
    });

    let update = ImpairmentUpdate::from_json(&value);
    Json(state.hub.update_impairment(update).await)
}

/// `GET /api/stats`
pub(crate) async fn get_stats(State(state): State<AppState>) -> Json<StatsSnapshot> {
    Json(state.hub.stats().snapshot())
}

/// `GET /broadcast-url`
pub(crate) async fn broadcast_url(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "url": state.broadcast_url() }))
}
