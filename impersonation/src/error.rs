use thiserror::Error;

use authz::error::AuthzError;

#[derive(Error, Debug)]
pub enum ImpersonationError {
    #[error("Impersonation does not support unauthenticated requests")]
    Unauthenticated,

    #[error("Impersonation does not support authentication type '{0}'")]
    UnsupportedAuthType(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Unable to start impersonation. Already impersonating user '{0}'. Stop impersonation first.")]
    AlreadyImpersonating(String),

    #[error("User '{0}' is not registered")]
    UnknownTarget(String),

    #[error("You are not allowed to impersonate user '{0}'")]
    NotPermitted(String),

    #[error("You are not allowed to impersonate user '{0}'")]
    PrivilegeEscalation(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<AuthzError> for ImpersonationError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::UnknownTarget(name) => ImpersonationError::UnknownTarget(name),
            AuthzError::Upstream(msg) => ImpersonationError::UpstreamUnavailable(msg),
        }
    }
}

pub type Result<T> = std::result::Result<T, ImpersonationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denials_share_a_generic_message() {
        let not_permitted = ImpersonationError::NotPermitted("carol".into());
        let escalation = ImpersonationError::PrivilegeEscalation("carol".into());
        assert_eq!(not_permitted.to_string(), escalation.to_string());
        assert_eq!(
            escalation.to_string(),
            "You are not allowed to impersonate user 'carol'"
        );
    }

    #[test]
    fn test_from_authz_error() {
        let err: ImpersonationError = AuthzError::UnknownTarget("bob".into()).into();
        assert!(matches!(err, ImpersonationError::UnknownTarget(name) if name == "bob"));

        let err: ImpersonationError = AuthzError::Upstream("timeout".into()).into();
        assert!(matches!(err, ImpersonationError::UpstreamUnavailable(_)));
    }
}
