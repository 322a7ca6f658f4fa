//! Error types for the impersonation permission gate.
//!
//! # Security Note
//! `UnknownTarget` names the requested user. It may only surface after the
//! caller has been authenticated, otherwise it turns into a user-enumeration
//! oracle. Permission denials are not errors; they are returned as
//! [`Decision::Deny`](crate::types::Decision::Deny).

use thiserror::Error;

/// Errors that can occur while evaluating an impersonation request.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// The impersonation target is not a registered principal.
    #[error("User '{0}' is not registered")]
    UnknownTarget(String),

    /// The claim catalog or principal directory could not be reached.
    ///
    /// This is an infrastructure failure and must never be read as a deny.
    #[error("Authorization store unavailable: {0}")]
    Upstream(String),
}

/// A specialized Result type for authorization operations.
pub type Result<T> = std::result::Result<T, AuthzError>;
