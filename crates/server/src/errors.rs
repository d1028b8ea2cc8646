use crate::models::ToolCallResponse;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;
use tooling::{ErrorKind, ToolFailure};

/// A failed tool call on its way back over HTTP.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {}", .0.kind.as_str(), .0.message)]
pub struct ApiError(pub ToolFailure);

impl ApiError {
    /// Returns the appropriate HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self.0.kind {
            ErrorKind::UnknownTool => 404,             // Not Found
            ErrorKind::InvalidInput => 400,            // Bad Request
            ErrorKind::HandlerError => 502,            // Bad Gateway (upstream provider failed)
            ErrorKind::OutputContractViolation => 500, // Internal Server Error (our bug)
        }
    }

    /// Returns true if the same call could succeed when repeated later
    pub fn is_retryable(&self) -> bool {
        match self.0.kind {
            ErrorKind::HandlerError => self
                .0
                .details
                .as_ref()
                .and_then(|details| details.get("retryable"))
                .and_then(|retryable| retryable.as_bool())
                .unwrap_or(false),
            ErrorKind::UnknownTool | ErrorKind::InvalidInput => false,
            ErrorKind::OutputContractViolation => false,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ToolCallResponse::Failure { error: self.0 };
        (status, Json(body)).into_response()
    }
}
