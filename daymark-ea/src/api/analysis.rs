//! Date analysis API handlers
//!
//! GET /analysis/:date, DELETE /analysis/:date/cache

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use chrono::NaiveDate;
use daymark_common::time::parse_iso_date;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{error::ApiResult, waterfall::DayAnalysis, AppState};

/// GET /analysis/:date query parameters
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    /// Bypass the record store and recent outcomes
    #[serde(default)]
    pub force: bool,
    /// Provider id (defaults to the configured provider)
    pub provider: Option<String>,
}

/// DELETE /analysis/:date/cache response
#[derive(Debug, Serialize)]
pub struct ForgetResponse {
    pub date: NaiveDate,
    pub removed: usize,
}

/// GET /analysis/:date
///
/// Malformed dates are rejected here with 400 before reaching the analyzer.
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(date): Path<String>,
    Query(query): Query<AnalysisQuery>,
) -> ApiResult<Json<DayAnalysis>> {
    let date = parse_iso_date(&date)?;
    let provider = query
        .provider
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| state.default_provider.clone());

    info!(date = %date, provider = %provider, force = query.force, "Analysis requested");

    let analysis = state.analyzer.analyze(date, query.force, &provider).await?;
    Ok(Json(analysis.as_ref().clone()))
}

/// DELETE /analysis/:date/cache
pub async fn forget_analysis(
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> ApiResult<Json<ForgetResponse>> {
    let date = parse_iso_date(&date)?;
    let removed = state.analyzer.forget(date);
    Ok(Json(ForgetResponse { date, removed }))
}

/// Build analysis routes
pub fn analysis_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis/:date", get(get_analysis))
        .route("/analysis/:date/cache", delete(forget_analysis))
}
