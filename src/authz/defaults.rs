use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::permission::{DomainPermission, Fill, SitePermission};

/// Built-in roles. Any other role name is a per-domain custom role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DefaultRole {
    Root,
    Admin,
    User,
    Guest,
    Judge,
}

impl DefaultRole {
    pub const ALL: [DefaultRole; 5] = [
        DefaultRole::Root,
        DefaultRole::Admin,
        DefaultRole::User,
        DefaultRole::Guest,
        DefaultRole::Judge,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Admin => "admin",
            Self::User => "user",
            Self::Guest => "guest",
            Self::Judge => "judge",
        }
    }

    /// Parses a role name, falling back to `Guest` when absent or unrecognized.
    pub fn resolve(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or(Self::Guest)
    }
}

impl fmt::Display for DefaultRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefaultRole {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == value)
            .ok_or(())
    }
}

/// Default permission of every built-in role at domain and site level.
///
/// Built once at startup and shared read-only between requests.
#[derive(Debug, Clone)]
pub struct PermissionTables {
    domain: HashMap<DefaultRole, DomainPermission>,
    site: HashMap<DefaultRole, SitePermission>,
}

impl PermissionTables {
    pub fn build() -> Self {
        let domain = HashMap::from([
            (DefaultRole::Root, DomainPermission::build(Fill::AllowAll)),
            (DefaultRole::Admin, DomainPermission::build(Fill::AllowAll)),
            (DefaultRole::User, DomainPermission::build(Fill::StructDefault)),
            (DefaultRole::Guest, DomainPermission::build(Fill::DenyAll)),
        ]);

        let guest_site = SitePermission::build(Fill::DenyAll, Fill::DenyAll);
        let mut judge_site = guest_site;
        judge_site.record.judge = true;

        let site = HashMap::from([
            (DefaultRole::Root, SitePermission::build(Fill::AllowAll, Fill::AllowAll)),
            (DefaultRole::Admin, SitePermission::build(Fill::StructDefault, Fill::AllowAll)),
            (DefaultRole::User, SitePermission::build(Fill::DenyAll, Fill::StructDefault)),
            (DefaultRole::Guest, guest_site),
            (DefaultRole::Judge, judge_site),
        ]);

        Self { domain, site }
    }

    /// `None` for roles without a domain-level entry (`Judge`).
    pub fn domain(&self, role: DefaultRole) -> Option<&DomainPermission> {
        self.domain.get(&role)
    }

    pub fn site(&self, role: DefaultRole) -> Option<&SitePermission> {
        self.site.get(&role)
    }

    pub fn guest_domain(&self) -> DomainPermission {
        self.domain(DefaultRole::Guest)
            .copied()
            .unwrap_or_else(|| DomainPermission::build(Fill::DenyAll))
    }

    pub fn guest_site(&self) -> SitePermission {
        self.site(DefaultRole::Guest)
            .copied()
            .unwrap_or_else(|| SitePermission::build(Fill::DenyAll, Fill::DenyAll))
    }

    /// Site permission of `role`, GUEST's when the role has no entry.
    pub fn site_or_guest(&self, role: DefaultRole) -> SitePermission {
        self.site(role).copied().unwrap_or_else(|| self.guest_site())
    }
}

impl Default for PermissionTables {
    fn default() -> Self {
        Self::build()
    }
}
