//! API error types
//!
//! Every failure leaving a resource handler is an [`ApiError`]; it renders
//! as a `Status` object whose `code` mirrors the HTTP status.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use kindserve_kernel::{CodecError, IdentityError, SchemeError, StoreError};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    AlreadyExists(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Internal(String),

    /// Arbitrary status raised by a hook or sub-resource.
    #[error("{message}")]
    Status { code: StatusCode, message: String },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        ApiError::Internal(msg.into())
    }

    pub fn status(code: StatusCode, msg: impl Into<String>) -> Self {
        ApiError::Status {
            code,
            message: msg.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Status { code, .. } => *code,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::AlreadyExists(_) => "AlreadyExists",
            ApiError::BadRequest(_) => "BadRequest",
            ApiError::Internal(_) => "InternalError",
            ApiError::Status { code, .. } if code.is_server_error() => "InternalError",
            ApiError::Status { .. } => "Unknown",
        }
    }

    pub fn to_status(&self) -> Status {
        Status {
            kind: "Status",
            api_version: "v1",
            status: "Failure",
            code: self.status_code().as_u16(),
            reason: self.reason(),
            message: self.to_string(),
        }
    }
}

/// Wire form of an error.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    pub kind: &'static str,
    pub api_version: &'static str,
    pub status: &'static str,
    pub code: u16,
    pub reason: &'static str,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = status.as_u16(), error = %self, "request failed");
        } else {
            tracing::debug!(code = status.as_u16(), error = %self, "request rejected");
        }
        (status, Json(self.to_status())).into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::Malformed(_) | CodecError::UnknownType(_) => {
                ApiError::BadRequest(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound(err.to_string()),
            StoreError::AlreadyExists(_) => ApiError::AlreadyExists(err.to_string()),
            StoreError::InvalidPatch(_) => ApiError::BadRequest(err.to_string()),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<SchemeError> for ApiError {
    fn from(err: SchemeError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
