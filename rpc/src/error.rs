//! API error type and its HTTP mapping.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ballast_ledger::{VoteError, VoteErrorKind};
use ballast_query::QueryError;
use ballast_reweigh::ReweighError;
use serde::Serialize;
use thiserror::Error;

/// Seconds a client should wait before retrying after a lock timeout.
const RETRY_AFTER_SECS: &str = "1";

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Vote(#[from] VoteError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<QueryError> for RpcError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::NotFound(what) => RpcError::NotFound(what),
            QueryError::Store(e) => RpcError::Internal(e.to_string()),
        }
    }
}

impl From<ReweighError> for RpcError {
    fn from(e: ReweighError) -> Self {
        RpcError::Internal(e.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub retryable: bool,
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            RpcError::Vote(e) => match e.kind() {
                VoteErrorKind::NotFound => StatusCode::NOT_FOUND,
                VoteErrorKind::AlreadyVoted => StatusCode::CONFLICT,
                VoteErrorKind::InvalidSignature => StatusCode::UNAUTHORIZED,
                VoteErrorKind::InvalidOption | VoteErrorKind::InvalidRequest => {
                    StatusCode::BAD_REQUEST
                }
                VoteErrorKind::WeightUnavailable => StatusCode::BAD_GATEWAY,
                VoteErrorKind::LockTimeout => StatusCode::SERVICE_UNAVAILABLE,
                VoteErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            RpcError::NotFound(_) => StatusCode::NOT_FOUND,
            RpcError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            RpcError::Unauthorized => StatusCode::UNAUTHORIZED,
            RpcError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            RpcError::Vote(e) => e.kind().as_str(),
            RpcError::NotFound(_) => "not_found",
            RpcError::InvalidRequest(_) => "invalid_request",
            RpcError::Unauthorized => "unauthorized",
            RpcError::Internal(_) => "internal",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Vote(e) if e.is_retryable())
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        }
        let body = ErrorBody {
            // Internal details stay in the log.
            error: match &self {
                RpcError::Internal(_) | RpcError::Vote(VoteError::Internal(_)) => {
                    "internal server error".to_string()
                }
                other => other.to_string(),
            },
            code: self.code(),
            retryable: self.is_retryable(),
        };
        let mut response = (status, Json(body)).into_response();
        if matches!(&self, RpcError::Vote(VoteError::LockTimeout { .. })) {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
        }
        response
    }
}
