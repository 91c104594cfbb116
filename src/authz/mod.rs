//! Authorization module - permission model, expressions and policy engine
//!
//! This module implements the two-level (site / domain) permission engine:
//! - Built-in role tables built from tri-state fills
//! - AND/OR permission expressions with flattening combinators
//! - Per-request context assembly from identity and domain membership
//! - Evaluation with the failing key reported on denial

mod context;
mod defaults;
mod evaluator;
mod expr;
mod permission;
mod requirement;
mod scope;

pub use context::{AuthContext, Identity, MembershipStore};
pub use defaults::{DefaultRole, PermissionTables};
pub use evaluator::{DefaultPolicyEvaluator, PolicyEvaluator};
pub use expr::{Action, DefinitionError, PermCompose, PermExpr, PermKey};
pub use permission::{
    DomainPermission, Fill, GeneralPermission, ProblemPermission, ProblemSetPermission, RecordPermission,
    SiteDomainPermission, SitePermission, SiteUserPermission,
};
pub use requirement::{is_domain_scoped, Requirement};
pub use scope::{PermissionType, ScopeType};

use std::sync::Arc;

use crate::errors::{AppError, AppResult};

/// Assembles request contexts and enforces requirements against them.
#[derive(Clone)]
pub struct Authorizer {
    tables: Arc<PermissionTables>,
    store: Arc<dyn MembershipStore>,
    evaluator: Arc<dyn PolicyEvaluator>,
}

impl Authorizer {
    pub fn new(tables: Arc<PermissionTables>, store: Arc<dyn MembershipStore>) -> Self {
        Self {
            tables,
            store,
            evaluator: Arc::new(DefaultPolicyEvaluator::new()),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn PolicyEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn tables(&self) -> &PermissionTables {
        &self.tables
    }

    pub fn store(&self) -> &dyn MembershipStore {
        self.store.as_ref()
    }

    pub fn evaluator(&self) -> &dyn PolicyEvaluator {
        self.evaluator.as_ref()
    }

    pub fn site_context(&self, identity: &Identity) -> AuthContext {
        AuthContext::site(&self.tables, identity)
    }

    pub async fn domain_context(&self, identity: &Identity, domain_token: &str) -> AppResult<AuthContext> {
        self.site_context(identity)
            .with_domain(&self.tables, self.store.as_ref(), domain_token)
            .await
    }

    /// Builds the context the requirement needs, then enforces it.
    ///
    /// A domain-scoped requirement without a domain token is rejected; a
    /// site-only requirement still resolves the domain when a token is given.
    pub async fn authorize(
        &self,
        identity: &Identity,
        domain_token: Option<&str>,
        requirement: &Requirement,
    ) -> AppResult<AuthContext> {
        let ctx = match domain_token {
            Some(token) => self.domain_context(identity, token).await?,
            None if requirement.is_domain_scoped() => {
                return Err(AppError::bad_request(format!(
                    "{} requires a domain",
                    requirement.expr()
                )));
            }
            None => self.site_context(identity),
        };

        self.evaluator.ensure(&ctx, requirement.expr())?;
        Ok(ctx)
    }

    pub fn evaluate(&self, ctx: &AuthContext, expr: &PermExpr) -> Option<PermKey> {
        self.evaluator.evaluate(ctx, expr)
    }
}
