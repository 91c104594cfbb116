use super::context::AuthContext;
use super::defaults::DefaultRole;
use super::expr::{Action, PermExpr, PermKey};
use crate::errors::{AppError, AppResult};

/// Policy evaluator trait for pluggable authorization logic.
///
/// Only `check` decides single keys; walking expressions and raising denials
/// is shared by every implementation.
pub trait PolicyEvaluator: Send + Sync {
    /// Whether the context grants one `(scope, permission)` pair.
    fn check(&self, ctx: &AuthContext, key: PermKey) -> bool;

    /// Returns `None` when `expr` passes, otherwise the key that denied it.
    ///
    /// AND reports its first failing child in declared order. OR passes on the
    /// first passing child and, when all fail, reports the first failure.
    fn evaluate(&self, ctx: &AuthContext, expr: &PermExpr) -> Option<PermKey> {
        match expr {
            PermExpr::Authenticated => None,
            PermExpr::Key(key) => (!self.check(ctx, *key)).then_some(*key),
            PermExpr::Compose(compose) => match compose.action() {
                Action::And => compose
                    .permissions()
                    .iter()
                    .find_map(|child| self.evaluate(ctx, child)),
                Action::Or => {
                    let mut failures = Vec::new();
                    for child in compose.permissions() {
                        match self.evaluate(ctx, child) {
                            None => return None,
                            Some(key) => failures.push(key),
                        }
                    }
                    tracing::debug!(
                        user_id = %ctx.user_id,
                        failures = ?failures.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        "every alternative denied"
                    );
                    Some(failures.first().copied().unwrap_or(PermKey::UNKNOWN))
                }
            },
        }
    }

    /// Raises `Forbidden` naming the denying key.
    fn ensure(&self, ctx: &AuthContext, expr: &PermExpr) -> AppResult<()> {
        match self.evaluate(ctx, expr) {
            None => Ok(()),
            Some(key) => {
                tracing::info!(
                    user_id = %ctx.user_id,
                    scope = %key.scope,
                    permission = %key.permission,
                    required = %expr,
                    "permission denied"
                );
                Err(AppError::forbidden(key))
            }
        }
    }
}

/// Default policy evaluator.
///
/// Evaluation order:
/// 1. site root -> allow
/// 2. domain root on a domain-scoped key -> allow
/// 3. site permission grants the key -> allow
/// 4. domain permission grants the key -> allow
/// 5. deny
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl PolicyEvaluator for DefaultPolicyEvaluator {
    fn check(&self, ctx: &AuthContext, key: PermKey) -> bool {
        if ctx.site_role == DefaultRole::Root {
            tracing::debug!(user_id = %ctx.user_id, scope = %key.scope, permission = %key.permission, "site root bypass");
            return true;
        }

        if ctx.is_domain_root() && key.scope.is_domain_scoped() {
            tracing::debug!(user_id = %ctx.user_id, scope = %key.scope, permission = %key.permission, "domain root bypass");
            return true;
        }

        if ctx.site_permission.grants(key) {
            tracing::debug!(user_id = %ctx.user_id, scope = %key.scope, permission = %key.permission, "site permission match");
            return true;
        }

        if ctx.domain_permission.grants(key) {
            tracing::debug!(
                user_id = %ctx.user_id,
                scope = %key.scope,
                permission = %key.permission,
                domain_role = %ctx.domain_role,
                "domain permission match"
            );
            return true;
        }

        tracing::debug!(user_id = %ctx.user_id, scope = %key.scope, permission = %key.permission, "permission denied");
        false
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::authz::context::Identity;
    use crate::authz::defaults::PermissionTables;
    use crate::authz::expr::PermExpr;
    use crate::authz::permission::{
        DomainPermission, Fill, GeneralPermission, ProblemPermission, RecordPermission, SiteDomainPermission,
        SiteUserPermission,
    };
    use crate::authz::scope::{PermissionType, ScopeType};

    fn context(site_role: &str, domain_role: &str, domain_permission: DomainPermission) -> AuthContext {
        let tables = PermissionTables::build();
        let mut ctx = AuthContext::site(&tables, &Identity::new(Uuid::new_v4()).with_role(site_role));
        ctx.domain_role = domain_role.to_string();
        ctx.domain_permission = domain_permission;
        ctx
    }

    fn every_key() -> Vec<PermKey> {
        ScopeType::ALL
            .iter()
            .flat_map(|scope| PermissionType::ALL.iter().map(|permission| PermKey::new(*scope, *permission)))
            .collect()
    }

    #[test]
    fn site_root_passes_everything() {
        let ctx = context("root", "guest", DomainPermission::build(Fill::DenyAll));
        let evaluator = DefaultPolicyEvaluator::new();
        assert!(every_key().into_iter().all(|key| evaluator.check(&ctx, key)));
    }

    #[test]
    fn domain_root_passes_domain_scopes_only() {
        let ctx = context("guest", "root", DomainPermission::build(Fill::DenyAll));
        let evaluator = DefaultPolicyEvaluator::new();
        for key in every_key() {
            assert_eq!(evaluator.check(&ctx, key), key.scope.is_domain_scoped(), "{key}");
        }
        assert!(!evaluator.check(&ctx, SiteDomainPermission::CREATE));
    }

    #[test]
    fn site_and_domain_grants_are_disjunctive() {
        let evaluator = DefaultPolicyEvaluator::new();
        let mut domain = DomainPermission::build(Fill::DenyAll);
        domain.general.unlimited_quota = true;

        // judge: record.judge from site, unlimited_quota from domain
        let ctx = context("judge", "ta", domain);
        assert!(evaluator.check(&ctx, RecordPermission::JUDGE));
        assert!(evaluator.check(&ctx, GeneralPermission::UNLIMITED_QUOTA));
        assert!(!evaluator.check(&ctx, RecordPermission::REJUDGE));
    }

    #[test]
    fn user_site_grants_site_only_defaults() {
        let evaluator = DefaultPolicyEvaluator::new();
        let ctx = context("user", "guest", DomainPermission::build(Fill::DenyAll));
        assert!(evaluator.check(&ctx, SiteUserPermission::VIEW));
        assert!(!evaluator.check(&ctx, SiteUserPermission::VIEW_LIST));
        assert!(!evaluator.check(&ctx, ProblemPermission::VIEW));
    }

    #[test]
    fn and_reports_first_failure_in_order() {
        let evaluator = DefaultPolicyEvaluator::new();
        let ctx = context("guest", "user", DomainPermission::default());
        let expr = ProblemPermission::VIEW & ProblemPermission::CREATE & ProblemPermission::EDIT;
        assert_eq!(evaluator.evaluate(&ctx, &expr), Some(ProblemPermission::CREATE));

        let expr = ProblemPermission::VIEW & ProblemPermission::CREATE & RecordPermission::VIEW;
        assert_eq!(evaluator.evaluate(&ctx, &expr), Some(ProblemPermission::CREATE));
    }

    #[test]
    fn or_passes_when_any_branch_passes() {
        let evaluator = DefaultPolicyEvaluator::new();
        let ctx = context("guest", "user", DomainPermission::default());
        let expr = ProblemPermission::CREATE | ProblemPermission::VIEW;
        assert_eq!(evaluator.evaluate(&ctx, &expr), None);
    }

    #[test]
    fn or_reports_first_failing_branch() {
        let evaluator = DefaultPolicyEvaluator::new();
        let ctx = context("guest", "user", DomainPermission::default());
        let expr = (ProblemPermission::EDIT & ProblemPermission::VIEW) | ProblemPermission::CREATE;
        assert_eq!(evaluator.evaluate(&ctx, &expr), Some(ProblemPermission::EDIT));
    }

    #[test]
    fn authenticated_always_passes() {
        let evaluator = DefaultPolicyEvaluator::new();
        let ctx = context("guest", "guest", DomainPermission::build(Fill::DenyAll));
        assert_eq!(evaluator.evaluate(&ctx, &PermExpr::authenticated()), None);
        assert!(evaluator.ensure(&ctx, &PermExpr::authenticated()).is_ok());
    }

    #[test]
    fn ensure_raises_forbidden_with_message() {
        let evaluator = DefaultPolicyEvaluator::new();
        let ctx = context("user", "guest", DomainPermission::build(Fill::DenyAll));
        let err = evaluator
            .ensure(&ctx, &PermExpr::from_expr(ProblemPermission::CREATE))
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Forbidden { scope: ScopeType::DomainProblem, permission: PermissionType::Create }
        ));
        assert_eq!(err.to_string(), "domain_problem create Permission Denied.");
    }
}
