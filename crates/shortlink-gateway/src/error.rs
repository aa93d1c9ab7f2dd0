use crate::model::ErrorResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use shortlink_core::{LinkError, StorageError};
use tracing::{error, warn};

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors a handler can answer with. Each maps to one status and message.
#[derive(Debug)]
pub enum AppError {
    BadRequest,
    InvalidUrl,
    NotFound,
    Conflict,
    Timeout,
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest | AppError::InvalidUrl => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            AppError::BadRequest => "bad request",
            AppError::InvalidUrl => "url is not valid",
            AppError::NotFound => "link not found",
            AppError::Conflict => "unable to create link",
            AppError::Timeout => "request timed out",
            AppError::Internal => "internal server error",
        }
    }
}

impl From<LinkError> for AppError {
    fn from(err: LinkError) -> Self {
        match err {
            LinkError::InvalidUrl { .. } => AppError::InvalidUrl,
            LinkError::NotFound => AppError::NotFound,
            LinkError::Storage(StorageError::Conflict(token)) => {
                warn!(token = %token, "token held by another live link");
                AppError::Conflict
            }
            LinkError::Storage(err) => {
                error!(error = %err, "storage failure while serving request");
                AppError::Internal
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            status: status.as_u16(),
            message: self.message().to_string(),
        };

        (status, Json(body)).into_response()
    }
}
