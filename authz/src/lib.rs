//! Claim-based permission gate for user impersonation.
//!
//! This crate decides whether one user may act as another. It owns the
//! decision only; the claims and principals it reads come from the host
//! platform through the [`catalog::ClaimCatalog`] and
//! [`catalog::PrincipalDirectory`] traits.
//!
//! # Decision Flow
//!
//! 1. **Resolve the target** in the principal directory (unknown → error)
//! 2. **Check the actor** holds `AllowImpersonation` (missing → deny)
//! 3. **Escalation bypass**: an actor holding `IncreasePermissions` is allowed
//! 4. **Subset check**: the target's active claims must all be held by the actor
//!
//! # Security Architecture
//!
//! - The target lookup must only run after the caller is authenticated,
//!   since `UnknownTarget` confirms whether a user name exists
//! - A store failure is an error, never a deny and never an allow
//! - Denials log the surplus count and a single example claim; the target's
//!   full permission set is never written out

pub mod catalog;
pub mod error;
pub mod types;

use std::sync::Arc;
use tracing::{debug, info};

use catalog::{ClaimCatalog, PrincipalDirectory};
use error::{AuthzError, Result};
use types::{Claim, ClaimGrant, Decision, DenyReason, ImpersonationClaims};

pub use catalog::InMemoryDirectory;

/// Evaluates impersonation requests against the host's claim catalog.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use authz::{InMemoryDirectory, PermissionGate, types::{Claim, ImpersonationClaims}};
///
/// # let runtime = tokio::runtime::Runtime::new().unwrap();
/// # runtime.block_on(async {
/// let mut directory = InMemoryDirectory::new();
/// directory.add_principal("alice");
/// directory.add_principal("bob");
/// directory.grant("alice", ImpersonationClaims::allow_impersonation());
/// directory.grant("alice", Claim::new("Document", "Read"));
/// directory.grant("bob", Claim::new("Document", "Read"));
///
/// let directory = Arc::new(directory);
/// let gate = PermissionGate::new(directory.clone(), directory);
/// let decision = gate.can_impersonate("alice", "bob").await.unwrap();
/// assert!(decision.is_allowed());
/// # });
/// ```
#[derive(Clone)]
pub struct PermissionGate {
    catalog: Arc<dyn ClaimCatalog>,
    directory: Arc<dyn PrincipalDirectory>,
}

impl PermissionGate {
    /// Creates a gate over the given catalog and directory.
    pub fn new(catalog: Arc<dyn ClaimCatalog>, directory: Arc<dyn PrincipalDirectory>) -> Self {
        Self { catalog, directory }
    }

    /// Decides whether `actual_user` may impersonate `impersonated_user`.
    ///
    /// # Returns
    ///
    /// - `Ok(Decision::Allow)` if impersonation may proceed
    /// - `Ok(Decision::Deny(_))` if the actor is not allowed
    /// - `Err(AuthzError::UnknownTarget)` if the target is not registered and
    ///   the actor holds the allow claim
    /// - `Err(AuthzError::Upstream)` if the catalog or directory failed
    pub async fn can_impersonate(
        &self,
        actual_user: &str,
        impersonated_user: &str,
    ) -> Result<Decision> {
        let allow = ImpersonationClaims::allow_impersonation();
        let increase = ImpersonationClaims::increase_permissions();
        let actor_grants = self.authorize(actual_user, &[allow.clone(), increase.clone()]).await?;
        let actor_holds = |claim: &Claim| {
            actor_grants
                .iter()
                .any(|grant| grant.granted && grant.claim == *claim)
        };

        if !actor_holds(&allow) {
            info!(
                "User '{}' doesn't have permission to impersonate other users. Claim '{}' is required.",
                actual_user, allow
            );
            return Ok(Decision::Deny(DenyReason::NotPermitted));
        }

        // Only checked once the actor may impersonate at all
        if self
            .directory
            .find_principal_id(impersonated_user)
            .await?
            .is_none()
        {
            return Err(AuthzError::UnknownTarget(impersonated_user.to_string()));
        }

        if actor_holds(&increase) {
            debug!(
                "User '{}' holds '{}', skipping the claim subset check",
                actual_user, increase
            );
            return Ok(Decision::Allow);
        }

        let surplus = self.surplus_claims(actual_user, impersonated_user).await?;
        let Some(example) = surplus.iter().min().cloned() else {
            return Ok(Decision::Allow);
        };

        info!(
            "User '{}' is not allowed to impersonate '{}' because the impersonated user has {} more security claims (for example '{}'). Increase the user's permissions or add '{}' security claim.",
            actual_user,
            impersonated_user,
            surplus.len(),
            example,
            increase
        );

        Ok(Decision::Deny(DenyReason::PrivilegeEscalation {
            surplus_count: surplus.len(),
            example,
        }))
    }

    /// Claims held by the target but not by the actor.
    async fn surplus_claims(&self, actual_user: &str, impersonated_user: &str) -> Result<Vec<Claim>> {
        let all_claims = self.catalog.active_claims().await?;

        let target_claims: Vec<Claim> = self
            .authorize(impersonated_user, &all_claims)
            .await?
            .into_iter()
            .filter(|grant| grant.granted)
            .map(|grant| grant.claim)
            .collect();

        if target_claims.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .authorize(actual_user, &target_claims)
            .await?
            .into_iter()
            .filter(|grant| !grant.granted)
            .map(|grant| grant.claim)
            .collect())
    }

    /// Calls the catalog and rejects answers that do not pair with the request.
    async fn authorize(&self, user_name: &str, claims: &[Claim]) -> Result<Vec<ClaimGrant>> {
        let grants = self.catalog.authorize(user_name, claims).await?;

        let paired = grants.len() == claims.len()
            && grants.iter().zip(claims).all(|(grant, claim)| grant.claim == *claim);
        if !paired {
            return Err(AuthzError::Upstream(format!(
                "claim catalog returned {} answers for {} requested claims",
                grants.len(),
                claims.len()
            )));
        }

        Ok(grants)
    }
}
