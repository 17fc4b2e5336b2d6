//! Prediction history handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::{AppState, AppResult};
use crate::models::{PredictionLog, PredictionLogFilter};

/// List recent prediction log entries, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<PredictionLogFilter>,
) -> AppResult<Json<Vec<PredictionLog>>> {
    let entries = PredictionLog::list(&state.pool, filter).await?;
    Ok(Json(entries))
}
