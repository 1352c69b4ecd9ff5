use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;

use crate::repository::errors::RepositoryError;
use crate::transport::DeliveryError;

#[derive(Debug, Error)]
pub enum UsecaseError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// Duplicate enquiry inside the dedup window.
    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    PropertyUnavailable(String),

    #[error("Notification delivery failed: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("{0}")]
    Internal(String),
}

impl UsecaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            UsecaseError::NotFound(_) => StatusCode::NOT_FOUND,
            UsecaseError::Forbidden(_) => StatusCode::FORBIDDEN,
            UsecaseError::Validation(_) => StatusCode::BAD_REQUEST,
            UsecaseError::Conflict(_) => StatusCode::CONFLICT,
            UsecaseError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            UsecaseError::PropertyUnavailable(_) => StatusCode::BAD_REQUEST,
            UsecaseError::Delivery(_) => StatusCode::BAD_GATEWAY,
            UsecaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            UsecaseError::NotFound(_) => "not_found",
            UsecaseError::Forbidden(_) => "forbidden",
            UsecaseError::Validation(_) => "validation",
            UsecaseError::Conflict(_) => "conflict",
            UsecaseError::RateLimited(_) => "rate_limited",
            UsecaseError::PropertyUnavailable(_) => "property_unavailable",
            UsecaseError::Delivery(_) => "delivery",
            UsecaseError::Internal(_) => "internal",
        }
    }
}

impl From<RepositoryError> for UsecaseError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::NotFound => UsecaseError::NotFound("Resource".to_string()),
            RepositoryError::DatabaseError(msg) => UsecaseError::Internal(msg),
        }
    }
}

impl From<validator::ValidationErrors> for UsecaseError {
    fn from(e: validator::ValidationErrors) -> Self {
        UsecaseError::Validation(e.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl IntoResponse for UsecaseError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();

        match &self {
            UsecaseError::Internal(_) => {
                tracing::error!(error = %self, "internal error");
            }
            UsecaseError::Delivery(_) => {
                tracing::error!(error = %self, "delivery error");
            }
            UsecaseError::NotFound(_) => {
                tracing::warn!(error = %self, "resource not found");
            }
            UsecaseError::Forbidden(_) => {
                tracing::warn!(error = %self, "forbidden");
            }
            _ => {
                tracing::debug!(error = %self);
            }
        }

        // Internal details stay in the logs.
        let message = match &self {
            UsecaseError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        (status, Json(ErrorBody { error: self.kind(), message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(UsecaseError::NotFound("Enquiry".into()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(UsecaseError::Forbidden("no".into()).status_code(), StatusCode::FORBIDDEN);
        assert_eq!(UsecaseError::Validation("bad".into()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(UsecaseError::Conflict("again".into()).status_code(), StatusCode::CONFLICT);
        assert_eq!(UsecaseError::RateLimited("slow".into()).status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            UsecaseError::Delivery(DeliveryError::NotConfigured("push")).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_repository_error_conversion() {
        let e: UsecaseError = RepositoryError::NotFound.into();
        assert!(matches!(e, UsecaseError::NotFound(_)));

        let e: UsecaseError = RepositoryError::DatabaseError("connection reset".into()).into();
        assert!(matches!(e, UsecaseError::Internal(_)));
    }

    #[test]
    fn test_not_found_message() {
        let e = UsecaseError::NotFound("Enquiry".to_string());
        assert_eq!(e.to_string(), "Enquiry not found");
    }

    #[test]
    fn test_internal_response_hides_details() {
        let response = UsecaseError::Internal("password=hunter2".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
