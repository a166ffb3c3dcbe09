//! daymark-ea library interface
//!
//! Exposes the analysis pipeline and HTTP router for the binary and integration tests.

pub mod api;
pub mod capabilities;
pub mod config;
pub mod error;
pub mod waterfall;

pub use crate::error::{AnalysisError, ApiError, ApiResult, CapabilityError};

use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::waterfall::DayAnalyzer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<DayAnalyzer>,
    /// Provider used when a request names none
    pub default_provider: String,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(analyzer: Arc<DayAnalyzer>, default_provider: String) -> Self {
        Self {
            analyzer,
            default_provider,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::analysis_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
