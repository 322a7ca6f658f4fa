//! Core authorization types for impersonation decisions.
//!
//! # Security Considerations
//!
//! ## Claims are compared by value
//! - A claim is identified only by its `(resource, right)` pair
//! - Ordering of claims never changes a decision, only which claim is
//!   reported as the diagnostic example
//!
//! ## Denial details stay on the server
//! - `DenyReason::PrivilegeEscalation` carries a surplus count and one
//!   example claim for server-side logs
//! - Never copy those details into a client-facing message

use serde::{Deserialize, Serialize};
use std::fmt;

/// An atomic permission, identified by resource and right.
///
/// Ordering is lexicographic by resource, then right. The permission gate
/// relies on this to pick a deterministic example from a surplus set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Claim {
    /// The protected resource (e.g., "Common.Principal")
    pub resource: String,

    /// The right on that resource (e.g., "Read", "Impersonate")
    pub right: String,
}

impl Claim {
    /// Creates a new claim.
    pub fn new(resource: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            right: right.into(),
        }
    }

    /// The `resource.right` form used in log lines.
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.resource, self.right)
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.resource, self.right)
    }
}

/// One authorization answer for one claim.
///
/// Returned by [`ClaimCatalog::authorize`](crate::catalog::ClaimCatalog::authorize)
/// in the same order as the requested claims, so a decision always travels
/// with the claim it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimGrant {
    pub claim: Claim,
    pub granted: bool,
}

impl ClaimGrant {
    pub fn new(claim: Claim, granted: bool) -> Self {
        Self { claim, granted }
    }
}

/// Identifier of a registered principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrincipalId(pub String);

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The claims contributed by the impersonation feature.
///
/// Hosts register these into their claim catalog at startup.
pub struct ImpersonationClaims;

impl ImpersonationClaims {
    pub const RESOURCE: &'static str = "WindowsAuthImpersonation.Impersonate";

    /// A user with this claim may impersonate other users at all.
    pub fn allow_impersonation() -> Claim {
        Claim::new(Self::RESOURCE, "AllowImpersonation")
    }

    /// A user with this claim may impersonate users that have more
    /// permissions than they do.
    pub fn increase_permissions() -> Claim {
        Claim::new(Self::RESOURCE, "IncreasePermissions")
    }

    /// Every claim this feature defines.
    pub fn all() -> Vec<Claim> {
        let mut claims = Self::default_admin_claims();
        claims.push(Self::increase_permissions());
        claims
    }

    /// Claims an administrator role is seeded with.
    ///
    /// `IncreasePermissions` is deliberately left out; it has to be granted
    /// explicitly.
    pub fn default_admin_claims() -> Vec<Claim> {
        vec![Self::allow_impersonation()]
    }
}

/// Why the gate refused an impersonation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenyReason {
    /// The actor lacks the `AllowImpersonation` claim.
    NotPermitted,

    /// The target holds claims the actor does not.
    PrivilegeEscalation {
        /// Number of claims the target has beyond the actor
        surplus_count: usize,
        /// Smallest surplus claim by resource, then right
        example: Claim,
    },
}

/// Outcome of a permission gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_creation() {
        let claim = Claim::new("Common.Principal", "Read");
        assert_eq!(claim.resource, "Common.Principal");
        assert_eq!(claim.right, "Read");
        assert_eq!(claim.full_name(), "Common.Principal.Read");
        assert_eq!(claim.to_string(), claim.full_name());
    }

    #[test]
    fn test_claim_equality_is_by_value() {
        assert_eq!(Claim::new("A", "x"), Claim::new("A", "x"));
        assert_ne!(Claim::new("A", "x"), Claim::new("A", "y"));
        assert_ne!(Claim::new("A", "x"), Claim::new("B", "x"));
    }

    #[test]
    fn test_claim_ordering_resource_then_right() {
        let mut claims = vec![
            Claim::new("B", "a"),
            Claim::new("A", "z"),
            Claim::new("A", "b"),
        ];
        claims.sort();
        assert_eq!(claims[0], Claim::new("A", "b"));
        assert_eq!(claims[1], Claim::new("A", "z"));
        assert_eq!(claims[2], Claim::new("B", "a"));
    }

    #[test]
    fn test_impersonation_claims() {
        let all = ImpersonationClaims::all();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&ImpersonationClaims::allow_impersonation()));
        assert!(all.contains(&ImpersonationClaims::increase_permissions()));

        let admin = ImpersonationClaims::default_admin_claims();
        assert_eq!(admin, vec![ImpersonationClaims::allow_impersonation()]);
    }

    #[test]
    fn test_decision_helpers() {
        assert!(Decision::Allow.is_allowed());
        assert!(!Decision::Deny(DenyReason::NotPermitted).is_allowed());
    }
}
