//! API errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::chain::{ChainError, ChainRecord};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request body does not decode into the expected shape
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// Well-formed candidate that failed validation against the tail
    #[error("Record rejected: {reason}")]
    Rejected {
        reason: String,
        candidate: Box<ChainRecord>,
    },

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    candidate: Option<ChainRecord>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            ApiError::Rejected { .. } => StatusCode::CONFLICT,
            ApiError::Serialization(_) | ApiError::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();
        let candidate = match self {
            ApiError::Rejected { candidate, .. } => Some(*candidate),
            _ => None,
        };

        (status, Json(ErrorBody { error, candidate })).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let candidate = Box::new(ChainRecord::genesis_at("t"));

        assert_eq!(ApiError::MalformedInput("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Rejected { reason: "x".into(), candidate }.status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Serialization("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Chain(ChainError::EmptyChain).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
