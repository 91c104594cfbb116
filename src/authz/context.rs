use async_trait::async_trait;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use super::defaults::{DefaultRole, PermissionTables};
use super::permission::{DomainPermission, SitePermission};
use crate::errors::{AppError, AppResult};
use crate::models::domain::{Domain, DomainRoleRecord, DomainUserRecord};

/// Already-verified identity claims of the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Uuid,
    /// Site role claim, if the token carries one.
    pub role: Option<String>,
}

impl Identity {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id, role: None }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }
}

/// Read-only access to domain membership and per-domain role overrides.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Resolves a domain path token (url slug or id).
    async fn find_domain(&self, token: &str) -> AppResult<Option<Domain>>;

    async fn find_domain_user(&self, domain_id: Uuid, user_id: Uuid) -> AppResult<Option<DomainUserRecord>>;

    async fn find_domain_role(&self, domain_id: Uuid, role: &str) -> AppResult<Option<DomainRoleRecord>>;

    async fn list_domain_roles(&self, domain_id: Uuid) -> AppResult<Vec<DomainRoleRecord>>;
}

/// Authorization state resolved for a single request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub site_role: DefaultRole,
    pub site_permission: SitePermission,
    pub domain: Option<Domain>,
    pub domain_role: String,
    pub domain_permission: DomainPermission,
}

impl AuthContext {
    /// Site-level resolution. Always performed, never suspends.
    pub fn site(tables: &PermissionTables, identity: &Identity) -> Self {
        let site_role = DefaultRole::resolve(identity.role.as_deref());
        let site_permission = tables.site_or_guest(site_role);

        tracing::debug!(user_id = %identity.user_id, site_role = %site_role, "site context resolved");

        Self {
            user_id: identity.user_id,
            site_role,
            site_permission,
            domain: None,
            domain_role: DefaultRole::Guest.as_str().to_string(),
            domain_permission: tables.guest_domain(),
        }
    }

    /// Domain-level resolution on top of a site context.
    pub async fn with_domain(
        mut self,
        tables: &PermissionTables,
        store: &dyn MembershipStore,
        domain_token: &str,
    ) -> AppResult<Self> {
        let domain = store
            .find_domain(domain_token)
            .await?
            .ok_or_else(|| AppError::not_found(format!("domain {domain_token} not found")))?;

        let domain_role = store
            .find_domain_user(domain.id, self.user_id)
            .await?
            .map(|record| record.role)
            .unwrap_or_else(|| DefaultRole::Guest.as_str().to_string());

        let domain_permission = resolve_domain_permission(tables, store, domain.id, &domain_role).await?;

        tracing::debug!(
            user_id = %self.user_id,
            domain_id = %domain.id,
            domain_role = %domain_role,
            "domain context resolved"
        );

        self.domain = Some(domain);
        self.domain_role = domain_role;
        self.domain_permission = domain_permission;
        Ok(self)
    }

    pub fn is_domain_root(&self) -> bool {
        self.domain_role == DefaultRole::Root.as_str()
    }
}

/// ROOT never consults stored overrides; any other role prefers the domain's
/// stored permission, then the built-in table, then GUEST.
async fn resolve_domain_permission(
    tables: &PermissionTables,
    store: &dyn MembershipStore,
    domain_id: Uuid,
    role: &str,
) -> AppResult<DomainPermission> {
    if role == DefaultRole::Root.as_str() {
        if let Some(root) = tables.domain(DefaultRole::Root) {
            return Ok(*root);
        }
    }

    if let Some(record) = store.find_domain_role(domain_id, role).await? {
        return Ok(record.permission);
    }

    let builtin = role
        .parse::<DefaultRole>()
        .ok()
        .and_then(|default_role| tables.domain(default_role));

    match builtin {
        Some(permission) => Ok(*permission),
        None => {
            tracing::debug!(domain_id = %domain_id, role = %role, "no permission for role, using guest");
            Ok(tables.guest_domain())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use chrono::Utc;

    use super::*;
    use crate::authz::permission::{Fill, ProblemPermission};

    /// In-memory membership store for unit tests.
    #[derive(Default)]
    pub(crate) struct MemoryStore {
        pub domains: Vec<Domain>,
        pub users: HashMap<(Uuid, Uuid), String>,
        pub roles: HashMap<(Uuid, String), DomainPermission>,
        pub fail: bool,
    }

    impl MemoryStore {
        pub fn with_domain(url: &str) -> (Self, Uuid) {
            let id = Uuid::new_v4();
            let store = Self {
                domains: vec![Domain {
                    id,
                    url: url.to_string(),
                    name: url.to_string(),
                    owner_id: None,
                    created_at: Utc::now(),
                }],
                ..Self::default()
            };
            (store, id)
        }

        fn check(&self) -> AppResult<()> {
            if self.fail {
                return Err(AppError::internal("membership store unavailable"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl MembershipStore for MemoryStore {
        async fn find_domain(&self, token: &str) -> AppResult<Option<Domain>> {
            self.check()?;
            Ok(self
                .domains
                .iter()
                .find(|d| d.url == token || d.id.to_string() == token)
                .cloned())
        }

        async fn find_domain_user(&self, domain_id: Uuid, user_id: Uuid) -> AppResult<Option<DomainUserRecord>> {
            self.check()?;
            Ok(self.users.get(&(domain_id, user_id)).map(|role| DomainUserRecord {
                domain_id,
                user_id,
                role: role.clone(),
            }))
        }

        async fn find_domain_role(&self, domain_id: Uuid, role: &str) -> AppResult<Option<DomainRoleRecord>> {
            self.check()?;
            Ok(self
                .roles
                .get(&(domain_id, role.to_string()))
                .map(|permission| DomainRoleRecord {
                    domain_id,
                    role: role.to_string(),
                    permission: *permission,
                }))
        }

        async fn list_domain_roles(&self, domain_id: Uuid) -> AppResult<Vec<DomainRoleRecord>> {
            self.check()?;
            Ok(self
                .roles
                .iter()
                .filter(|((id, _), _)| *id == domain_id)
                .map(|((id, role), permission)| DomainRoleRecord {
                    domain_id: *id,
                    role: role.clone(),
                    permission: *permission,
                })
                .collect())
        }
    }

    #[test]
    fn site_context_falls_back_to_guest() {
        let tables = PermissionTables::build();
        let ctx = AuthContext::site(&tables, &Identity::new(Uuid::new_v4()).with_role("overlord"));
        assert_eq!(ctx.site_role, DefaultRole::Guest);
        assert_eq!(ctx.site_permission, tables.guest_site());
        assert_eq!(ctx.domain_role, "guest");
        assert!(ctx.domain.is_none());
    }

    #[tokio::test]
    async fn non_member_is_domain_guest() {
        let tables = PermissionTables::build();
        let (store, _) = MemoryStore::with_domain("d");
        let ctx = AuthContext::site(&tables, &Identity::new(Uuid::new_v4()).with_role("user"))
            .with_domain(&tables, &store, "d")
            .await
            .unwrap();
        assert_eq!(ctx.domain_role, "guest");
        assert_eq!(ctx.domain_permission, tables.guest_domain());
    }

    #[tokio::test]
    async fn stored_role_overrides_builtin() {
        let tables = PermissionTables::build();
        let user_id = Uuid::new_v4();
        let (mut store, domain_id) = MemoryStore::with_domain("d");
        store.users.insert((domain_id, user_id), "user".to_string());
        let mut custom = DomainPermission::build(Fill::DenyAll);
        custom.problem.create = true;
        store.roles.insert((domain_id, "user".to_string()), custom);

        let ctx = AuthContext::site(&tables, &Identity::new(user_id))
            .with_domain(&tables, &store, &domain_id.to_string())
            .await
            .unwrap();
        assert_eq!(ctx.domain_permission, custom);
        assert!(ctx.domain_permission.grants(ProblemPermission::CREATE));
    }

    #[tokio::test]
    async fn root_ignores_stored_override() {
        let tables = PermissionTables::build();
        let user_id = Uuid::new_v4();
        let (mut store, domain_id) = MemoryStore::with_domain("d");
        store.users.insert((domain_id, user_id), "root".to_string());
        store
            .roles
            .insert((domain_id, "root".to_string()), DomainPermission::build(Fill::DenyAll));

        let ctx = AuthContext::site(&tables, &Identity::new(user_id))
            .with_domain(&tables, &store, "d")
            .await
            .unwrap();
        assert!(ctx.is_domain_root());
        assert_eq!(Some(&ctx.domain_permission), tables.domain(DefaultRole::Root));
    }

    #[tokio::test]
    async fn custom_and_judge_roles_without_rows_use_guest() {
        let tables = PermissionTables::build();
        let (mut store, domain_id) = MemoryStore::with_domain("d");
        let ta = Uuid::new_v4();
        let judge = Uuid::new_v4();
        store.users.insert((domain_id, ta), "ta".to_string());
        store.users.insert((domain_id, judge), "judge".to_string());

        for user_id in [ta, judge] {
            let ctx = AuthContext::site(&tables, &Identity::new(user_id))
                .with_domain(&tables, &store, "d")
                .await
                .unwrap();
            assert_eq!(ctx.domain_permission, tables.guest_domain());
        }
    }

    #[tokio::test]
    async fn unknown_domain_is_not_found() {
        let tables = PermissionTables::build();
        let (store, _) = MemoryStore::with_domain("d");
        let result = AuthContext::site(&tables, &Identity::new(Uuid::new_v4()))
            .with_domain(&tables, &store, "missing")
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn store_failure_aborts_resolution() {
        let tables = PermissionTables::build();
        let (mut store, _) = MemoryStore::with_domain("d");
        store.fail = true;
        let result = AuthContext::site(&tables, &Identity::new(Uuid::new_v4()).with_role("root"))
            .with_domain(&tables, &store, "d")
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }
}
