//! The error taxonomy for the queue engine (spec §7).
//!
//! Every write-path operation either fully commits or returns one of
//! these variants; no stack traces are surfaced to callers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::server::response::ApiResponse;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    FailedPrecondition(String),

    #[error("concurrent writer beat us, retries exhausted")]
    Conflict,

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn status(&self) -> StatusCode {
        match self {
            EngineError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            EngineError::Unauthorized => StatusCode::UNAUTHORIZED,
            EngineError::Forbidden(_) => StatusCode::FORBIDDEN,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::FailedPrecondition(_) => StatusCode::BAD_REQUEST,
            EngineError::Conflict => StatusCode::CONFLICT,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => EngineError::NotFound(what),
            StoreError::Conflict => EngineError::Conflict,
            StoreError::Database(e) => {
                tracing::error!(error = %e, "store error");
                EngineError::Internal(e.to_string())
            }
        }
    }
}

impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = %err, "unexpected error");
        EngineError::Internal(err.to_string())
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()>::error(self.to_string());
        (status, axum::Json(body)).into_response()
    }
}
