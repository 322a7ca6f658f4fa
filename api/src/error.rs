use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use impersonation::ImpersonationError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

/// API Error types
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Impersonation(#[from] ImpersonationError),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response structure for OpenAPI documentation
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ApiErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Impersonation(err) => match err {
                ImpersonationError::Unauthenticated => StatusCode::UNAUTHORIZED,
                ImpersonationError::UnsupportedAuthType(_) => StatusCode::UNAUTHORIZED,
                ImpersonationError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                ImpersonationError::AlreadyImpersonating(_) => StatusCode::CONFLICT,
                ImpersonationError::UnknownTarget(_) => StatusCode::BAD_REQUEST,
                ImpersonationError::NotPermitted(_) => StatusCode::FORBIDDEN,
                ImpersonationError::PrivilegeEscalation(_) => StatusCode::FORBIDDEN,
                ImpersonationError::ProtocolViolation(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ImpersonationError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                ImpersonationError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code for the error type
    pub fn error_code(&self) -> &str {
        match self {
            ApiError::Impersonation(err) => match err {
                ImpersonationError::Unauthenticated => "UNAUTHENTICATED",
                ImpersonationError::UnsupportedAuthType(_) => "UNSUPPORTED_AUTH_TYPE",
                ImpersonationError::InvalidArgument(_) => "INVALID_ARGUMENT",
                ImpersonationError::AlreadyImpersonating(_) => "ALREADY_IMPERSONATING",
                ImpersonationError::UnknownTarget(_) => "UNKNOWN_TARGET",
                ImpersonationError::NotPermitted(_) => "NOT_PERMITTED",
                ImpersonationError::PrivilegeEscalation(_) => "PRIVILEGE_ESCALATION",
                ImpersonationError::UpstreamUnavailable(_) => "UPSTREAM_UNAVAILABLE",
                ImpersonationError::ProtocolViolation(_) | ImpersonationError::Configuration(_) => {
                    "INTERNAL_ERROR"
                }
            },
            ApiError::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to the client.
    ///
    /// Internal failures are logged in full and answered generically.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Impersonation(
                ImpersonationError::ProtocolViolation(_) | ImpersonationError::Configuration(_),
            )
            | ApiError::InternalError(_) => "Internal server error".to_string(),
            ApiError::Impersonation(ImpersonationError::UpstreamUnavailable(_)) => {
                "Authorization store unavailable".to_string()
            }
            ApiError::Impersonation(
                ImpersonationError::NotPermitted(user) | ImpersonationError::PrivilegeEscalation(user),
            ) => format!("You are not allowed to impersonate user '{}'.", user),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed with {}: {}", status, self);
        } else {
            warn!("Request rejected with {}: {}", status, self);
        }

        let error_response = ApiErrorResponse {
            error: ErrorDetail {
                code: self.error_code().to_string(),
                message: self.client_message(),
            },
        };

        (status, Json(error_response)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
