//! The session ticket and the impersonation marker it carries.
//!
//! The ticket `payload` is either empty or exactly `"Impersonating:" + user`.
//! Anything else was written by an incompatible component and is rejected
//! rather than reinterpreted.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ImpersonationError, Result};

/// Prefix marking an impersonation payload.
pub const IMPERSONATING_PREFIX: &str = "Impersonating:";

/// Protocol version stamped on every ticket this crate creates.
pub const TICKET_VERSION: i32 = 2;

/// Opaque per-client record of who is logged in and whom they impersonate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub version: i32,
    pub actual_user: String,
    pub issue_time: DateTime<Utc>,
    pub expire_time: DateTime<Utc>,
    pub persistent: bool,
    #[serde(default)]
    pub payload: String,
    /// Cookie path the ticket is written under
    #[serde(default = "default_path")]
    pub path: String,
}

fn default_path() -> String {
    "/".to_string()
}

/// `now + timeout`, saturating at the latest representable time.
pub fn expiry_after(now: DateTime<Utc>, timeout: Duration) -> DateTime<Utc> {
    now.checked_add_signed(timeout)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl SessionToken {
    /// A ticket for `actual_user` with no impersonation, valid for `timeout`.
    pub fn fresh(actual_user: impl Into<String>, now: DateTime<Utc>, timeout: Duration) -> Self {
        Self {
            version: TICKET_VERSION,
            actual_user: actual_user.into(),
            issue_time: now,
            expire_time: expiry_after(now, timeout),
            persistent: false,
            payload: String::new(),
            path: default_path(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_time <= now
    }

    /// Lifetime left at `now`; negative once expired.
    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        self.expire_time - now
    }

    /// The impersonated user, or `None` when not impersonating.
    pub fn impersonated_user(&self) -> Result<Option<String>> {
        decode_payload(&self.payload)
    }

    /// Copy of this ticket with a new payload; every other field is kept.
    pub fn with_impersonated_user(&self, impersonated_user: Option<&str>) -> Self {
        Self {
            persistent: false,
            payload: encode_payload(impersonated_user),
            ..self.clone()
        }
    }

    /// Scope the ticket cookie to `path`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Copy of this ticket expiring at `expire_time`; the payload is kept.
    pub fn renewed(&self, expire_time: DateTime<Utc>) -> Self {
        Self {
            expire_time,
            persistent: false,
            ..self.clone()
        }
    }
}

/// Encodes the impersonation marker for a payload field.
pub fn encode_payload(impersonated_user: Option<&str>) -> String {
    match impersonated_user {
        Some(user) if !user.is_empty() => format!("{}{}", IMPERSONATING_PREFIX, user),
        _ => String::new(),
    }
}

/// Decodes a payload field into the impersonated user.
pub fn decode_payload(payload: &str) -> Result<Option<String>> {
    if payload.is_empty() {
        return Ok(None);
    }

    match payload.strip_prefix(IMPERSONATING_PREFIX) {
        Some(user) if !user.is_empty() => Ok(Some(user.to_string())),
        Some(_) => Err(ImpersonationError::ProtocolViolation(
            "ticket payload names no impersonated user".to_string(),
        )),
        None => Err(ImpersonationError::ProtocolViolation(
            "ticket payload was written by an incompatible component".to_string(),
        )),
    }
}
