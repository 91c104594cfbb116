use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::authz::DomainPermission;

/// A tenant. Looked up either by its url slug or by its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Domain {
    pub id: Uuid,
    #[schema(example = "acm-training")]
    pub url: String,
    pub name: String,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Binds a user to a role inside one domain. Unique per `(domain_id, user_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DomainUserRecord {
    pub domain_id: Uuid,
    pub user_id: Uuid,
    #[schema(example = "admin")]
    pub role: String,
}

/// A domain's override of what a named role may do there.
/// Unique per `(domain_id, role)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DomainRoleRecord {
    pub domain_id: Uuid,
    #[schema(example = "ta")]
    pub role: String,
    pub permission: DomainPermission,
}
