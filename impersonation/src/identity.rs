//! Identities supplied by the external authentication layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    config::ImpersonationConfig,
    error::{ImpersonationError, Result},
};

/// The authenticated caller, as reported by the identity layer.
///
/// Impersonation never creates recognized identities itself; it only reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub authentication_type: String,
    pub is_authenticated: bool,
}

impl Identity {
    /// An identity the authentication layer has vouched for
    pub fn authenticated(name: impl Into<String>, authentication_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authentication_type: authentication_type.into(),
            is_authenticated: true,
        }
    }

    /// The identity of a request nobody has authenticated
    pub fn anonymous() -> Self {
        Self {
            name: String::new(),
            authentication_type: String::new(),
            is_authenticated: false,
        }
    }
}

/// Everything a core operation needs to know about the current request.
///
/// Built once per request by the caller and passed explicitly.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Identity,
    /// Clock reading taken when the request arrived
    pub now: DateTime<Utc>,
    /// Client workstation, if the transport knows it
    pub workstation: Option<String>,
}

impl RequestContext {
    pub fn new(identity: Identity, now: DateTime<Utc>) -> Self {
        Self {
            identity,
            now,
            workstation: None,
        }
    }

    pub fn with_workstation(mut self, workstation: impl Into<String>) -> Self {
        self.workstation = Some(workstation.into());
        self
    }

    /// The name of the actual (not impersonated) user.
    ///
    /// Fails with `Unauthenticated` for anonymous or nameless identities and
    /// with `UnsupportedAuthType` for schemes the configuration does not accept.
    pub fn resolve_actual_user(&self, config: &ImpersonationConfig) -> Result<&str> {
        let identity = &self.identity;
        if !identity.is_authenticated || identity.name.is_empty() {
            return Err(ImpersonationError::Unauthenticated);
        }
        if !config.accepts_auth_type(&identity.authentication_type) {
            return Err(ImpersonationError::UnsupportedAuthType(
                identity.authentication_type.clone(),
            ));
        }
        Ok(&identity.name)
    }
}
