use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::expr::DefinitionError;

/// Namespace a permission belongs to.
///
/// Domain scopes are always qualified by a domain; site scopes apply to the
/// whole application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ScopeType {
    DomainGeneral,
    DomainProblem,
    DomainProblemSet,
    DomainRecord,
    SiteUser,
    SiteDomain,
    /// Diagnostic sentinel, never granted.
    Unknown,
}

impl ScopeType {
    pub const ALL: [ScopeType; 7] = [
        ScopeType::DomainGeneral,
        ScopeType::DomainProblem,
        ScopeType::DomainProblemSet,
        ScopeType::DomainRecord,
        ScopeType::SiteUser,
        ScopeType::SiteDomain,
        ScopeType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DomainGeneral => "domain_general",
            Self::DomainProblem => "domain_problem",
            Self::DomainProblemSet => "domain_problem_set",
            Self::DomainRecord => "domain_record",
            Self::SiteUser => "site_user",
            Self::SiteDomain => "site_domain",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the scope is qualified within a domain.
    pub fn is_domain_scoped(&self) -> bool {
        matches!(
            self,
            Self::DomainGeneral | Self::DomainProblem | Self::DomainProblemSet | Self::DomainRecord
        )
    }
}

impl fmt::Display for ScopeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScopeType {
    type Err = DefinitionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scope| scope.as_str() == value)
            .ok_or_else(|| DefinitionError::UnknownScope(value.to_string()))
    }
}

/// Action identifier within a scope.
///
/// Not every action exists in every scope: a scope only grants the actions its
/// permission struct declares a field for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    View,
    ViewHidden,
    ViewConfig,
    Edit,
    Create,
    Submit,
    Claim,
    Scoreboard,
    Manage,
    Judge,
    Rejudge,
    Delete,
    ViewList,
    UnlimitedQuota,
    EditPermission,
    /// Diagnostic sentinel, never granted.
    Unknown,
}

impl PermissionType {
    pub const ALL: [PermissionType; 16] = [
        PermissionType::View,
        PermissionType::ViewHidden,
        PermissionType::ViewConfig,
        PermissionType::Edit,
        PermissionType::Create,
        PermissionType::Submit,
        PermissionType::Claim,
        PermissionType::Scoreboard,
        PermissionType::Manage,
        PermissionType::Judge,
        PermissionType::Rejudge,
        PermissionType::Delete,
        PermissionType::ViewList,
        PermissionType::UnlimitedQuota,
        PermissionType::EditPermission,
        PermissionType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::ViewHidden => "view_hidden",
            Self::ViewConfig => "view_config",
            Self::Edit => "edit",
            Self::Create => "create",
            Self::Submit => "submit",
            Self::Claim => "claim",
            Self::Scoreboard => "scoreboard",
            Self::Manage => "manage",
            Self::Judge => "judge",
            Self::Rejudge => "rejudge",
            Self::Delete => "delete",
            Self::ViewList => "view_list",
            Self::UnlimitedQuota => "unlimited_quota",
            Self::EditPermission => "edit_permission",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for PermissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionType {
    type Err = DefinitionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|permission| permission.as_str() == value)
            .ok_or_else(|| DefinitionError::UnknownPermission(value.to_string()))
    }
}
