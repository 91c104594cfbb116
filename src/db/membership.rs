use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use super::row_parsers::{domain_from_row, domain_role_from_row, domain_user_from_row};
use crate::authz::MembershipStore;
use crate::errors::AppResult;
use crate::models::domain::{Domain, DomainRoleRecord, DomainUserRecord};

/// Reads domain membership and role overrides from SQLite. Never writes.
#[derive(Debug, Clone)]
pub struct SqliteMembershipStore {
    pool: SqlitePool,
}

impl SqliteMembershipStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MembershipStore for SqliteMembershipStore {
    async fn find_domain(&self, token: &str) -> AppResult<Option<Domain>> {
        let by_url = sqlx::query("SELECT id, url, name, owner_id, created_at FROM domains WHERE url = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = by_url {
            return Ok(Some(domain_from_row(&row)?));
        }

        // fall back to the id form of the token
        let Ok(id) = Uuid::parse_str(token) else {
            return Ok(None);
        };

        let by_id = sqlx::query("SELECT id, url, name, owner_id, created_at FROM domains WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        by_id.map(|row| domain_from_row(&row)).transpose()
    }

    async fn find_domain_user(&self, domain_id: Uuid, user_id: Uuid) -> AppResult<Option<DomainUserRecord>> {
        let row = sqlx::query("SELECT domain_id, user_id, role FROM domain_users WHERE domain_id = ? AND user_id = ?")
            .bind(domain_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| domain_user_from_row(&row)).transpose()
    }

    async fn find_domain_role(&self, domain_id: Uuid, role: &str) -> AppResult<Option<DomainRoleRecord>> {
        let row = sqlx::query("SELECT domain_id, role, permission FROM domain_roles WHERE domain_id = ? AND role = ?")
            .bind(domain_id.to_string())
            .bind(role)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| domain_role_from_row(&row)).transpose()
    }

    async fn list_domain_roles(&self, domain_id: Uuid) -> AppResult<Vec<DomainRoleRecord>> {
        let rows = sqlx::query("SELECT domain_id, role, permission FROM domain_roles WHERE domain_id = ? ORDER BY role")
            .bind(domain_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(domain_role_from_row).collect()
    }
}
