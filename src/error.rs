use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::Value;
use thiserror::Error;

/// Failures talking to the document-search engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("search engine unreachable: {0}")]
    Unavailable(String),

    /// The engine answered with a non-success status; `info` is its diagnostic body.
    #[error("search engine rejected request ({status}): {info}")]
    Rejected { status: u16, info: Value },

    #[error("unexpected search engine response: {0}")]
    Protocol(String),
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            EngineError::Unavailable(err.to_string())
        } else {
            EngineError::Protocol(err.to_string())
        }
    }
}

/// Errors surfaced by the backend endpoints.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Elasticsearch not available")]
    Unavailable,

    #[error("{0}")]
    InvalidInput(String),

    #[error("Elasticsearch error: {0}")]
    Engine(Value),

    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// Classify an engine failure; `fallback` is the generic message for anything
    /// that is neither unreachability nor an engine rejection.
    pub fn from_engine(err: EngineError, fallback: &'static str) -> Self {
        match err {
            EngineError::Unavailable(_) => ApiError::Unavailable,
            EngineError::Rejected { info, .. } => ApiError::Engine(info),
            EngineError::Protocol(_) => ApiError::Internal(fallback),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Engine(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "detail": self.to_string() });
        (self.status(), Json(body)).into_response()
    }
}

/// Errors surfaced by the frontend proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Could not connect to backend service: {0}")]
    Unreachable(#[from] reqwest::Error),

    #[error("Internal proxy error: {0}")]
    Internal(String),
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = match self {
            ProxyError::Unreachable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = serde_json::json!({ "detail": self.to_string() });
        (status, Json(body)).into_response()
    }
}
