//! Interfaces to the claim catalog and principal directory.
//!
//! Both are owned by the host platform. The gate only reads from them and
//! never retries; a failed lookup surfaces as [`AuthzError::Upstream`].

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::{
    error::Result,
    types::{Claim, ClaimGrant, ImpersonationClaims, PrincipalId},
};

#[cfg(doc)]
use crate::error::AuthzError;

/// Source of active claims and of per-user authorization answers.
#[async_trait]
pub trait ClaimCatalog: Send + Sync {
    /// Every claim currently marked active.
    async fn active_claims(&self) -> Result<Vec<Claim>>;

    /// Answers, for each claim in order, whether `user_name` holds it.
    ///
    /// The returned grants must pair one-to-one with `claims`.
    async fn authorize(&self, user_name: &str, claims: &[Claim]) -> Result<Vec<ClaimGrant>>;
}

/// Lookup of registered principals by user name.
#[async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_principal_id(&self, name: &str) -> Result<Option<PrincipalId>>;
}

/// A claim as written in a directory file.
#[derive(Debug, Clone, Deserialize)]
struct ClaimRecord {
    resource: String,
    right: String,
    #[serde(default = "default_active")]
    active: bool,
}

fn default_active() -> bool {
    true
}

/// On-disk shape of an [`InMemoryDirectory`].
#[derive(Debug, Default, Deserialize)]
struct DirectoryFile {
    #[serde(default)]
    principals: Vec<String>,
    #[serde(default)]
    claims: Vec<ClaimRecord>,
    #[serde(default)]
    grants: HashMap<String, Vec<Claim>>,
    /// Users seeded with the default administrator claims
    #[serde(default)]
    administrators: Vec<String>,
}

/// A process-local catalog and directory.
///
/// Built once at startup and then shared read-only, so no locking is needed.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    principals: HashMap<String, PrincipalId>,
    claims: Vec<(Claim, bool)>,
    grants: HashMap<String, HashSet<Claim>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a directory from JSON.
    ///
    /// ```json
    /// {
    ///   "principals": ["alice", "bob"],
    ///   "claims": [{ "resource": "Common.Principal", "right": "Read" }],
    ///   "grants": { "alice": [{ "resource": "Common.Principal", "right": "Read" }] },
    ///   "administrators": ["alice"]
    /// }
    /// ```
    ///
    /// Claims referenced by a grant are registered as active if the
    /// `claims` list does not mention them. Administrators receive
    /// [`ImpersonationClaims::default_admin_claims`].
    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        let file: DirectoryFile = serde_json::from_str(json)?;
        let mut directory = Self::new();

        for name in file.principals {
            directory.add_principal(name);
        }
        for record in file.claims {
            directory.add_claim(Claim::new(record.resource, record.right), record.active);
        }
        for (user, claims) in file.grants {
            for claim in claims {
                directory.grant(&user, claim);
            }
        }
        for admin in file.administrators {
            for claim in ImpersonationClaims::default_admin_claims() {
                directory.grant(&admin, claim);
            }
        }

        Ok(directory)
    }

    /// Registers a principal and returns its identifier.
    ///
    /// Registering an existing name keeps the original identifier.
    pub fn add_principal(&mut self, name: impl Into<String>) -> PrincipalId {
        self.principals
            .entry(name.into())
            .or_insert_with(|| PrincipalId(ulid::Ulid::new().to_string()))
            .clone()
    }

    /// Adds a claim to the catalog, or updates its active flag.
    pub fn add_claim(&mut self, claim: Claim, active: bool) {
        match self.claims.iter_mut().find(|(c, _)| *c == claim) {
            Some(entry) => entry.1 = active,
            None => self.claims.push((claim, active)),
        }
    }

    /// Registers claims as active unless the catalog already knows them.
    pub fn register_claims(&mut self, claims: impl IntoIterator<Item = Claim>) {
        for claim in claims {
            if !self.claims.iter().any(|(c, _)| *c == claim) {
                self.claims.push((claim, true));
            }
        }
    }

    /// Grants a claim to a user, registering the claim as active if unknown.
    pub fn grant(&mut self, user_name: &str, claim: Claim) {
        if !self.claims.iter().any(|(c, _)| *c == claim) {
            self.claims.push((claim.clone(), true));
        }
        self.grants
            .entry(user_name.to_string())
            .or_default()
            .insert(claim);
    }

    pub fn principal_count(&self) -> usize {
        self.principals.len()
    }
}

#[async_trait]
impl ClaimCatalog for InMemoryDirectory {
    async fn active_claims(&self) -> Result<Vec<Claim>> {
        Ok(self
            .claims
            .iter()
            .filter(|(_, active)| *active)
            .map(|(claim, _)| claim.clone())
            .collect())
    }

    async fn authorize(&self, user_name: &str, claims: &[Claim]) -> Result<Vec<ClaimGrant>> {
        let held = self.grants.get(user_name);
        debug!(
            "Authorizing {} claims for user {} (holds {})",
            claims.len(),
            user_name,
            held.map_or(0, HashSet::len)
        );

        Ok(claims
            .iter()
            .map(|claim| {
                let granted = held.is_some_and(|set| set.contains(claim));
                ClaimGrant::new(claim.clone(), granted)
            })
            .collect())
    }
}

#[async_trait]
impl PrincipalDirectory for InMemoryDirectory {
    async fn find_principal_id(&self, name: &str) -> Result<Option<PrincipalId>> {
        Ok(self.principals.get(name).cloned())
    }
}
