//! Impersonation configuration, prioritizing environment variables

use std::env;

use chrono::Duration;
use tracing::{debug, warn};

use crate::error::{ImpersonationError, Result};

/// Environment variable holding the ticket timeout in minutes.
pub const TIMEOUT_ENV: &str = "IMPERSONATION_TICKET_SLIDING_TIMEOUT_MINS";
/// Environment variable overriding the ticket cookie name.
pub const COOKIE_NAME_ENV: &str = "IMPERSONATION_COOKIE_NAME";
/// Environment variable holding a comma-separated list of accepted authentication types.
pub const AUTH_TYPES_ENV: &str = "IMPERSONATION_ACCEPTED_AUTH_TYPES";

const DEFAULT_TIMEOUT_MINUTES: i64 = 30;
/// Longest accepted ticket timeout, one year.
pub const MAX_TIMEOUT_MINUTES: i64 = 60 * 24 * 365;
const DEFAULT_COOKIE_NAME: &str = "impersonation_ticket";

/// Authentication schemes for which impersonation is well-defined.
pub const DEFAULT_ACCEPTED_AUTH_TYPES: [&str; 4] = ["Negotiate", "Windows", "Kerberos", "NTLM"];

/// Impersonation settings shared by every request
#[derive(Debug, Clone)]
pub struct ImpersonationConfig {
    /// Lifetime of a ticket; the slider renews once half of it has passed
    pub ticket_timeout: Duration,
    /// Name of the cookie carrying the ticket
    pub cookie_name: String,
    /// Path the ticket cookie is scoped to
    pub cookie_path: String,
    /// Authentication types whose identities may impersonate
    pub accepted_auth_types: Vec<String>,
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            ticket_timeout: Duration::minutes(DEFAULT_TIMEOUT_MINUTES),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_path: "/".to_string(),
            accepted_auth_types: DEFAULT_ACCEPTED_AUTH_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ImpersonationConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(value) = env::var(TIMEOUT_ENV) {
            config.ticket_timeout = parse_timeout(&value);
        }

        if let Ok(name) = env::var(COOKIE_NAME_ENV) {
            config.cookie_name = name;
        }

        if let Ok(types) = env::var(AUTH_TYPES_ENV) {
            config.accepted_auth_types = types
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        debug!(
            "Impersonation config: timeout={}m cookie={} auth_types={:?}",
            config.ticket_timeout.num_minutes(),
            config.cookie_name,
            config.accepted_auth_types
        );
        config
    }

    /// Set the ticket timeout
    pub fn with_ticket_timeout(mut self, timeout: Duration) -> Self {
        self.ticket_timeout = timeout;
        self
    }

    /// Set the accepted authentication types
    pub fn with_accepted_auth_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepted_auth_types = types.into_iter().map(Into::into).collect();
        self
    }

    /// Whether identities of this authentication type may impersonate
    pub fn accepts_auth_type(&self, auth_type: &str) -> bool {
        self.accepted_auth_types.iter().any(|t| t == auth_type)
    }

    /// Reject settings the session and transport cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.ticket_timeout <= Duration::zero() {
            return Err(ImpersonationError::Configuration(
                "ticket timeout must be positive".to_string(),
            ));
        }
        if self.ticket_timeout > Duration::minutes(MAX_TIMEOUT_MINUTES) {
            return Err(ImpersonationError::Configuration(format!(
                "ticket timeout cannot exceed {} minutes",
                MAX_TIMEOUT_MINUTES
            )));
        }
        if self.cookie_name.trim().is_empty() {
            return Err(ImpersonationError::Configuration(
                "cookie name cannot be empty".to_string(),
            ));
        }
        if self.accepted_auth_types.is_empty() {
            return Err(ImpersonationError::Configuration(
                "at least one authentication type must be accepted".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_timeout(value: &str) -> Duration {
    let minutes = value
        .trim()
        .parse::<i64>()
        .ok()
        .filter(|minutes| (1..=MAX_TIMEOUT_MINUTES).contains(minutes))
        .and_then(Duration::try_minutes);

    match minutes {
        Some(timeout) => timeout,
        None => {
            warn!(
                "Invalid {} value '{}', using {} minutes",
                TIMEOUT_ENV, value, DEFAULT_TIMEOUT_MINUTES
            );
            Duration::minutes(DEFAULT_TIMEOUT_MINUTES)
        }
    }
}
