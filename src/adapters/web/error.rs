//! JSON error responses for the web adapter.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::domain::error::{FetchError, StockStudyError};

#[derive(Debug)]
pub struct WebError {
    pub status: StatusCode,
    pub message: String,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<FetchError> for WebError {
    fn from(err: FetchError) -> Self {
        let status = match &err {
            FetchError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            FetchError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_GATEWAY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<StockStudyError> for WebError {
    fn from(err: StockStudyError) -> Self {
        match err {
            StockStudyError::Fetch(fetch) => fetch.into(),
            StockStudyError::InvalidInput { .. } | StockStudyError::Series(_) => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            other => Self::internal(other.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.message }))).into_response()
    }
}
