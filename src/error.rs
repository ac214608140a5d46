use crate::models::{ErrorResponse, RequestError};
use crate::services::UpstreamError;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

pub const UNREACHABLE_MESSAGE: &str =
    "Backend API is not reachable. Please ensure the Python API is running.";
pub const UNREACHABLE_SUGGESTION: &str = "Run: cd backend && uvicorn main:app --reload";

/// Failure of a gateway request, rendered as a JSON body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Request body exceeds {0} bytes")]
    PayloadTooLarge(usize),

    #[error(transparent)]
    InvalidBody(#[from] RequestError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

impl ApiError {
    fn body(&self) -> ErrorResponse {
        match self {
            ApiError::MissingFields(_) => ErrorResponse::new(self.to_string()),
            ApiError::PayloadTooLarge(_) => {
                ErrorResponse::new("Payload too large").with_details(self.to_string())
            }
            ApiError::Upstream(UpstreamError::Rejected { status, message }) => ErrorResponse {
                error: message.clone(),
                details: None,
                suggestion: None,
                status: Some(*status),
            },
            ApiError::Upstream(UpstreamError::Unreachable(base_url)) => {
                ErrorResponse::new(UNREACHABLE_MESSAGE)
                    .with_details(format!("Could not connect to {}", base_url))
                    .with_suggestion(UNREACHABLE_SUGGESTION)
            }
            ApiError::InvalidBody(_) | ApiError::Upstream(_) => {
                ErrorResponse::new("Internal server error").with_details(self.to_string())
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingFields(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Upstream(UpstreamError::Rejected { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            ApiError::Upstream(UpstreamError::Unreachable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::InvalidBody(_) | ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(self.body())
    }
}
