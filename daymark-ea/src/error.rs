//! Error types for daymark-ea
//!
//! Three layers:
//! - `CapabilityError`: an injected external capability failed. Always recoverable; the pipeline
//!   degrades instead of surfacing it.
//! - `AnalysisError`: the few failures that reach an `analyze` caller. `Clone` because one
//!   outcome is shared by every coalesced caller.
//! - `ApiError`: HTTP mapping of the above.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// External capability failure (search, validation, summarization, lookup, storage)
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Status(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Capability not configured (e.g. missing API key)
    #[error("Capability unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CapabilityError::Parse(err.to_string())
        } else {
            CapabilityError::Network(err.to_string())
        }
    }
}

/// Errors an analysis caller can observe
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    /// Neither the summarization capability nor the local generator produced a usable summary
    #[error("No usable summary for {date}: {reason}")]
    SummaryUnavailable { date: String, reason: String },

    /// Caller asked for a provider that is not registered
    #[error("Unknown analysis provider: {0}")]
    UnknownProvider(String),

    /// The shared run ended without producing an outcome (task panicked or was aborted)
    #[error("Analysis run aborted: {0}")]
    Aborted(String),
}

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Analysis failure
    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    /// daymark-common error
    #[error("Common error: {0}")]
    Common(#[from] daymark_common::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self {
            ApiError::Analysis(AnalysisError::UnknownProvider(_)) => {
                (StatusCode::BAD_REQUEST, "UNKNOWN_PROVIDER")
            }
            ApiError::Analysis(AnalysisError::SummaryUnavailable { .. }) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SUMMARY_UNAVAILABLE")
            }
            ApiError::Analysis(AnalysisError::Aborted(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "ANALYSIS_ABORTED")
            }
            ApiError::Common(daymark_common::Error::InvalidInput(_)) => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT")
            }
            ApiError::Common(_) => (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR"),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
