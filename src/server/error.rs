use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::{error, warn};

use crate::audit::{AuditError, EncodingError};
use crate::zip::PackError;

/// Everything that can end a request early. None of these stop the process.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("No file field named \"file\" in the upload")]
    MissingFile,

    #[error("Malformed upload: {message}")]
    MalformedUpload { status: StatusCode, message: String },

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Package(#[from] PackError),

    #[error("Upstream processing failed: {0}")]
    UpstreamProcessing(#[from] AuditError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFile | AppError::Encoding(_) => StatusCode::BAD_REQUEST,
            AppError::MalformedUpload { status, .. } => *status,
            AppError::Package(PackError::Io(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Package(_) => StatusCode::BAD_REQUEST,
            AppError::UpstreamProcessing(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::MalformedUpload {
            status: err.status(),
            message: err.body_text(),
        }
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::MalformedUpload {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(%status, "request failed: {self}");
        } else {
            warn!(%status, "request rejected: {self}");
        }

        (status, self.to_string()).into_response()
    }
}
