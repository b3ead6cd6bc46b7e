//! Role Authority Module
//!
//! Maps wallet identities onto the ordered role hierarchy and gates every
//! privileged mutation in the registry. Role assignments persist in the
//! `role_assignments` collection; the contract owner's admin role is a local
//! constant and is never read from or written to storage.
//!
//! Failure semantics: role lookups fail open to `user` when the document
//! store is unavailable — availability over strictness — except for the
//! owner identity, which resolves to `admin` before storage is consulted.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::document_store::{DocumentStore, ListQuery, ROLE_ASSIGNMENTS};
use crate::error::{RegistryError, Result};

/// Privilege levels, totally ordered. A higher rank implies every permission
/// of the ranks below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    OrganizationVerifier,
    Moderator,
    Admin,
}

impl Role {
    /// Position in the hierarchy
    pub fn rank(self) -> u8 {
        match self {
            Self::User => 0,
            Self::OrganizationVerifier => 1,
            Self::Moderator => 2,
            Self::Admin => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::OrganizationVerifier => "organization_verifier",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

/// One active role per wallet address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub wallet_address: String,
    pub role: Role,
    pub assigned_by: String,
    pub assigned_at: String,
}

/// Derives, persists, and checks roles for wallet identities
pub struct RoleAuthority {
    store: Arc<dyn DocumentStore>,
    owner_account: String,
}

impl RoleAuthority {
    pub fn new(store: Arc<dyn DocumentStore>, owner_account: impl Into<String>) -> Self {
        Self {
            store,
            owner_account: owner_account.into(),
        }
    }

    pub fn owner_account(&self) -> &str {
        &self.owner_account
    }

    /// Resolve the effective role for an identity.
    ///
    /// The owner check runs before any storage call and therefore survives
    /// storage outage. Unknown non-owner identities are provisioned with the
    /// `user` role on first sight; storage errors for non-owner identities
    /// fail open to `user`.
    pub async fn role_of(&self, identity: &str) -> Role {
        if identity == self.owner_account {
            return Role::Admin;
        }
        match self.lookup(identity).await {
            Ok(Some((_, assignment))) => assignment.role,
            Ok(None) => {
                if let Err(e) = self.provision_default(identity).await {
                    warn!(identity, error = %e, "failed to provision default role");
                }
                Role::User
            }
            Err(e) => {
                warn!(identity, error = %e, "role lookup failed, defaulting to user");
                Role::User
            }
        }
    }

    /// True iff the identity's role ranks at least as high as `required`
    pub async fn has_at_least(&self, identity: &str, required: Role) -> bool {
        self.role_of(identity).await.rank() >= required.rank()
    }

    /// Upsert the role assignment for `target`.
    ///
    /// Requires the acting identity to hold `admin`. The owner's admin role
    /// is immutable: any attempt to assign the owner something else fails
    /// with a policy error before storage is touched, and assigning `admin`
    /// to the owner persists nothing since the override is not a stored fact.
    pub async fn assign_role(&self, acting: &str, target: &str, new_role: Role) -> Result<Role> {
        if !self.has_at_least(acting, Role::Admin).await {
            return Err(RegistryError::Authorization(format!(
                "{} lacks the admin role required to assign roles",
                acting
            )));
        }
        if target == self.owner_account {
            if new_role != Role::Admin {
                return Err(RegistryError::Policy(
                    "the contract owner's admin role is immutable".to_string(),
                ));
            }
            return Ok(Role::Admin);
        }

        let now = Utc::now().to_rfc3339();
        match self.lookup(target).await? {
            Some((doc_id, _)) => {
                self.store
                    .update(
                        ROLE_ASSIGNMENTS,
                        &doc_id,
                        json!({
                            "role": new_role,
                            "assigned_by": acting,
                            "assigned_at": now,
                        }),
                    )
                    .await?;
            }
            None => {
                let assignment = RoleAssignment {
                    wallet_address: target.to_string(),
                    role: new_role,
                    assigned_by: acting.to_string(),
                    assigned_at: now,
                };
                self.store
                    .insert(ROLE_ASSIGNMENTS, serde_json::to_value(&assignment)?)
                    .await?;
            }
        }
        Ok(new_role)
    }

    async fn lookup(&self, identity: &str) -> Result<Option<(String, RoleAssignment)>> {
        let docs = self
            .store
            .list(
                ROLE_ASSIGNMENTS,
                ListQuery::all().filter_eq("wallet_address", identity),
            )
            .await?;
        let Some(doc) = docs.into_iter().next() else {
            return Ok(None);
        };
        let assignment: RoleAssignment = serde_json::from_value(doc.data)?;
        Ok(Some((doc.id, assignment)))
    }

    async fn provision_default(&self, identity: &str) -> Result<()> {
        let assignment = RoleAssignment {
            wallet_address: identity.to_string(),
            role: Role::User,
            assigned_by: "system".to_string(),
            assigned_at: Utc::now().to_rfc3339(),
        };
        self.store
            .insert(ROLE_ASSIGNMENTS, serde_json::to_value(&assignment)?)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::{FailingStore, MemoryStore};

    const OWNER: &str = "bernieio.testnet";

    fn authority() -> RoleAuthority {
        RoleAuthority::new(Arc::new(MemoryStore::new()), OWNER)
    }

    #[test]
    fn test_hierarchy_ranks() {
        assert_eq!(Role::User.rank(), 0);
        assert_eq!(Role::OrganizationVerifier.rank(), 1);
        assert_eq!(Role::Moderator.rank(), 2);
        assert_eq!(Role::Admin.rank(), 3);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::OrganizationVerifier).unwrap(),
            "\"organization_verifier\""
        );
        let role: Role = serde_json::from_str("\"moderator\"").unwrap();
        assert_eq!(role, Role::Moderator);
    }

    #[tokio::test]
    async fn test_owner_is_admin_without_storage() {
        let authority = RoleAuthority::new(Arc::new(FailingStore), OWNER);
        assert_eq!(authority.role_of(OWNER).await, Role::Admin);
        assert!(authority.has_at_least(OWNER, Role::Admin).await);
    }

    #[tokio::test]
    async fn test_storage_failure_fails_open_to_user() {
        let authority = RoleAuthority::new(Arc::new(FailingStore), OWNER);
        assert_eq!(authority.role_of("bob.testnet").await, Role::User);
    }

    #[tokio::test]
    async fn test_first_sight_provisions_user_assignment() {
        let store = Arc::new(MemoryStore::new());
        let authority = RoleAuthority::new(store.clone(), OWNER);

        assert_eq!(authority.role_of("alice.testnet").await, Role::User);

        let docs = store
            .list(
                ROLE_ASSIGNMENTS,
                ListQuery::all().filter_eq("wallet_address", "alice.testnet"),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        let assignment: RoleAssignment = serde_json::from_value(docs[0].data.clone()).unwrap();
        assert_eq!(assignment.role, Role::User);
        assert_eq!(assignment.assigned_by, "system");
    }

    #[tokio::test]
    async fn test_assign_role_requires_admin() {
        let authority = authority();
        let err = authority
            .assign_role("bob.testnet", "carol.testnet", Role::Moderator)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Authorization(_)));

        // target's stored role unchanged
        assert_eq!(authority.role_of("carol.testnet").await, Role::User);
    }

    #[tokio::test]
    async fn test_assign_role_upserts() {
        let store = Arc::new(MemoryStore::new());
        let authority = RoleAuthority::new(store.clone(), OWNER);

        authority
            .assign_role(OWNER, "org.testnet", Role::OrganizationVerifier)
            .await
            .unwrap();
        assert_eq!(
            authority.role_of("org.testnet").await,
            Role::OrganizationVerifier
        );

        authority
            .assign_role(OWNER, "org.testnet", Role::Moderator)
            .await
            .unwrap();
        assert_eq!(authority.role_of("org.testnet").await, Role::Moderator);

        // exactly one assignment per wallet
        let docs = store
            .list(
                ROLE_ASSIGNMENTS,
                ListQuery::all().filter_eq("wallet_address", "org.testnet"),
            )
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn test_owner_role_is_immutable() {
        let store = Arc::new(MemoryStore::new());
        let authority = RoleAuthority::new(store.clone(), OWNER);

        let err = authority
            .assign_role(OWNER, OWNER, Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::Policy(_)));
        assert_eq!(authority.role_of(OWNER).await, Role::Admin);

        // the rejection happens before any storage write
        let docs = store
            .list(
                ROLE_ASSIGNMENTS,
                ListQuery::all().filter_eq("wallet_address", OWNER),
            )
            .await
            .unwrap();
        assert!(docs.is_empty());
    }

    #[tokio::test]
    async fn test_assign_admin_to_owner_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let authority = RoleAuthority::new(store.clone(), OWNER);

        let role = authority.assign_role(OWNER, OWNER, Role::Admin).await.unwrap();
        assert_eq!(role, Role::Admin);

        let docs = store
            .list(ROLE_ASSIGNMENTS, ListQuery::all())
            .await
            .unwrap();
        assert!(docs.is_empty());
    }
}
