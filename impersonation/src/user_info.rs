//! The user the rest of the platform should treat as the caller.

use serde::{Deserialize, Serialize};

use crate::{error::Result, session::ImpersonationSession, transport::TicketTransport};

/// Effective identity of a request once impersonation is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveUser {
    /// The actual (not impersonated) user that is logged in
    pub actual_user: String,
    /// The impersonated user whose permissions are in effect, if any
    pub impersonated_user: Option<String>,
    pub workstation: Option<String>,
}

impl EffectiveUser {
    /// Derive the effective user from the request's session.
    pub fn from_session<T: TicketTransport>(session: &mut ImpersonationSession<'_, T>) -> Result<Self> {
        let actual_user = session.actual_user()?.to_string();
        let impersonated_user = session.current_impersonated_user()?;
        Ok(Self {
            actual_user,
            impersonated_user,
            workstation: session.workstation().map(str::to_string),
        })
    }

    /// The view for a request nobody has authenticated.
    pub fn unrecognized(workstation: Option<String>) -> Self {
        Self {
            actual_user: String::new(),
            impersonated_user: None,
            workstation,
        }
    }

    /// Whether the identity layer vouched for the caller.
    pub fn is_recognized(&self) -> bool {
        !self.actual_user.is_empty()
    }

    /// The user name authorization and auditing should use.
    pub fn user_name(&self) -> &str {
        self.impersonated_user.as_deref().unwrap_or(&self.actual_user)
    }

    /// The actual user while impersonating, otherwise `None`.
    pub fn impersonated_by(&self) -> Option<&str> {
        self.impersonated_user
            .as_ref()
            .map(|_| self.actual_user.as_str())
    }

    /// One-line description for audit logs.
    pub fn report(&self) -> String {
        let workstation = self.workstation.as_deref().unwrap_or_default();
        match &self.impersonated_user {
            Some(impersonated) => format!("{} as {},{}", self.actual_user, impersonated, workstation),
            None => format!("{},{}", self.actual_user, workstation),
        }
    }
}
