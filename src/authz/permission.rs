use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::expr::PermKey;
use super::scope::{PermissionType, ScopeType};

/// How every field of a permission struct is populated when it is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fill {
    /// Every field set to `true`, ignoring the per-field defaults.
    AllowAll,
    /// Every field set to `false`, ignoring the per-field defaults.
    DenyAll,
    /// Every field keeps its hard-coded per-field default.
    StructDefault,
}

impl Fill {
    pub fn resolve(self, field_default: bool) -> bool {
        match self {
            Fill::AllowAll => true,
            Fill::DenyAll => false,
            Fill::StructDefault => field_default,
        }
    }
}

/// Declares one permission struct: its scope, its ordered fields, and the
/// built-in default of every field. Each field also gets an associated
/// `PermKey` constant naming it.
macro_rules! permission_struct {
    (
        $(#[$meta:meta])*
        $name:ident => $scope:path {
            $($field:ident / $konst:ident : $perm:ident = $default:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
        #[serde(default)]
        pub struct $name {
            $(pub $field: bool,)+
        }

        impl $name {
            pub const SCOPE: ScopeType = $scope;

            /// Fields in declaration order, paired with their built-in default.
            pub const FIELDS: &'static [(PermissionType, bool)] = &[$((PermissionType::$perm, $default)),+];

            $(pub const $konst: PermKey = PermKey::new($scope, PermissionType::$perm);)+

            pub fn build(fill: Fill) -> Self {
                Self {
                    $($field: fill.resolve($default),)+
                }
            }

            /// `None` when this scope has no such field.
            pub fn get(&self, permission: PermissionType) -> Option<bool> {
                match permission {
                    $(PermissionType::$perm => Some(self.$field),)+
                    _ => None,
                }
            }

            pub fn entries(&self) -> Vec<(PermKey, bool)> {
                vec![$((Self::$konst, self.$field)),+]
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::build(Fill::StructDefault)
            }
        }
    };
}

permission_struct! {
    /// Domain-wide capabilities.
    GeneralPermission => ScopeType::DomainGeneral {
        edit_permission / EDIT_PERMISSION: EditPermission = false,
        unlimited_quota / UNLIMITED_QUOTA: UnlimitedQuota = false,
    }
}

permission_struct! {
    ProblemPermission => ScopeType::DomainProblem {
        create / CREATE: Create = false,
        view / VIEW: View = true,
        view_hidden / VIEW_HIDDEN: ViewHidden = false,
        submit / SUBMIT: Submit = true,
        edit / EDIT: Edit = false,
        view_config / VIEW_CONFIG: ViewConfig = false,
    }
}

permission_struct! {
    ProblemSetPermission => ScopeType::DomainProblemSet {
        create / CREATE: Create = false,
        view / VIEW: View = true,
        view_hidden / VIEW_HIDDEN: ViewHidden = false,
        claim / CLAIM: Claim = true,
        scoreboard / SCOREBOARD: Scoreboard = false,
        manage / MANAGE: Manage = false,
        edit / EDIT: Edit = false,
        view_config / VIEW_CONFIG: ViewConfig = false,
    }
}

permission_struct! {
    RecordPermission => ScopeType::DomainRecord {
        view / VIEW: View = true,
        judge / JUDGE: Judge = false,
        rejudge / REJUDGE: Rejudge = false,
    }
}

permission_struct! {
    /// Site-level user administration.
    SiteUserPermission => ScopeType::SiteUser {
        view / VIEW: View = true,
        view_list / VIEW_LIST: ViewList = false,
        edit / EDIT: Edit = false,
        delete / DELETE: Delete = false,
    }
}

permission_struct! {
    /// Site-level domain administration.
    SiteDomainPermission => ScopeType::SiteDomain {
        create / CREATE: Create = true,
        view_list / VIEW_LIST: ViewList = false,
        edit / EDIT: Edit = false,
        delete / DELETE: Delete = false,
    }
}

/// What a role may do inside one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct DomainPermission {
    pub general: GeneralPermission,
    pub problem: ProblemPermission,
    pub problem_set: ProblemSetPermission,
    pub record: RecordPermission,
}

impl DomainPermission {
    pub fn build(fill: Fill) -> Self {
        Self {
            general: GeneralPermission::build(fill),
            problem: ProblemPermission::build(fill),
            problem_set: ProblemSetPermission::build(fill),
            record: RecordPermission::build(fill),
        }
    }

    pub fn get(&self, scope: ScopeType, permission: PermissionType) -> Option<bool> {
        match scope {
            ScopeType::DomainGeneral => self.general.get(permission),
            ScopeType::DomainProblem => self.problem.get(permission),
            ScopeType::DomainProblemSet => self.problem_set.get(permission),
            ScopeType::DomainRecord => self.record.get(permission),
            _ => None,
        }
    }

    pub fn grants(&self, key: PermKey) -> bool {
        self.get(key.scope, key.permission).unwrap_or(false)
    }

    pub fn entries(&self) -> Vec<(PermKey, bool)> {
        let mut entries = self.general.entries();
        entries.extend(self.problem.entries());
        entries.extend(self.problem_set.entries());
        entries.extend(self.record.entries());
        entries
    }
}

/// What a role may do at site level, including the domain-scoped grants it
/// implies in every domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SitePermission {
    pub general: GeneralPermission,
    pub problem: ProblemPermission,
    pub problem_set: ProblemSetPermission,
    pub record: RecordPermission,
    pub user: SiteUserPermission,
    pub domain: SiteDomainPermission,
}

impl SitePermission {
    /// `domain_fill` populates the domain-scoped part, `site_fill` the two
    /// site-only structs.
    pub fn build(domain_fill: Fill, site_fill: Fill) -> Self {
        Self::from_parts(
            DomainPermission::build(domain_fill),
            SiteUserPermission::build(site_fill),
            SiteDomainPermission::build(site_fill),
        )
    }

    pub fn from_parts(
        domain_part: DomainPermission,
        user: SiteUserPermission,
        domain: SiteDomainPermission,
    ) -> Self {
        Self {
            general: domain_part.general,
            problem: domain_part.problem,
            problem_set: domain_part.problem_set,
            record: domain_part.record,
            user,
            domain,
        }
    }

    pub fn domain_part(&self) -> DomainPermission {
        DomainPermission {
            general: self.general,
            problem: self.problem,
            problem_set: self.problem_set,
            record: self.record,
        }
    }

    pub fn get(&self, scope: ScopeType, permission: PermissionType) -> Option<bool> {
        match scope {
            ScopeType::SiteUser => self.user.get(permission),
            ScopeType::SiteDomain => self.domain.get(permission),
            _ => self.domain_part().get(scope, permission),
        }
    }

    pub fn grants(&self, key: PermKey) -> bool {
        self.get(key.scope, key.permission).unwrap_or(false)
    }

    pub fn entries(&self) -> Vec<(PermKey, bool)> {
        let mut entries = self.domain_part().entries();
        entries.extend(self.user.entries());
        entries.extend(self.domain.entries());
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_fill_overrides_field_defaults() {
        let allowed = ProblemPermission::build(Fill::AllowAll);
        assert!(allowed.entries().iter().all(|(_, value)| *value));

        let denied = ProblemPermission::build(Fill::DenyAll);
        assert!(denied.entries().iter().all(|(_, value)| !*value));
    }

    #[test]
    fn struct_default_keeps_each_field_default() {
        let problem = ProblemPermission::build(Fill::StructDefault);
        for ((key, value), (permission, default)) in problem.entries().iter().zip(ProblemPermission::FIELDS) {
            assert_eq!(key.permission, *permission);
            assert_eq!(value, default);
        }
        assert!(problem.view);
        assert!(problem.submit);
        assert!(!problem.create);
    }

    #[test]
    fn lookup_respects_struct_fields() {
        let permission = DomainPermission::build(Fill::AllowAll);
        assert_eq!(permission.get(ScopeType::DomainProblem, PermissionType::Submit), Some(true));
        // record has no `submit` field
        assert_eq!(permission.get(ScopeType::DomainRecord, PermissionType::Submit), None);
        assert_eq!(permission.get(ScopeType::SiteUser, PermissionType::View), None);
        assert!(!permission.grants(PermKey::new(ScopeType::DomainRecord, PermissionType::Submit)));
    }

    #[test]
    fn site_permission_splits_fills() {
        let site = SitePermission::build(Fill::StructDefault, Fill::AllowAll);
        assert_eq!(site.domain_part(), DomainPermission::default());
        assert!(site.user.entries().iter().all(|(_, value)| *value));
        assert!(site.grants(SiteDomainPermission::DELETE));
        assert!(!site.grants(ProblemPermission::CREATE));
    }

    #[test]
    fn missing_json_fields_use_struct_defaults() {
        let parsed: DomainPermission =
            serde_json::from_value(serde_json::json!({ "problem": { "create": true } })).unwrap();
        assert!(parsed.problem.create);
        assert!(parsed.problem.view);
        assert!(!parsed.problem.edit);
        assert_eq!(parsed.record, RecordPermission::default());
    }

    #[test]
    fn associated_keys_name_their_scope() {
        assert_eq!(ProblemSetPermission::SCOREBOARD.scope, ScopeType::DomainProblemSet);
        assert_eq!(ProblemSetPermission::SCOREBOARD.permission, PermissionType::Scoreboard);
        assert_eq!(GeneralPermission::SCOPE, ScopeType::DomainGeneral);
    }
}
