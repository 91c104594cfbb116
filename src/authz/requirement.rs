use super::expr::PermExpr;

/// Whether any key of the tree lives in a domain scope.
pub fn is_domain_scoped(expr: &PermExpr) -> bool {
    match expr {
        PermExpr::Authenticated => false,
        PermExpr::Key(key) => key.scope.is_domain_scoped(),
        PermExpr::Compose(compose) => compose.permissions().iter().any(is_domain_scoped),
    }
}

/// The permission an operation declares, classified once at declaration time.
///
/// A domain-scoped requirement needs the domain-level context, and so a
/// domain path token, before it can be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    expr: PermExpr,
    domain_scoped: bool,
}

impl Requirement {
    pub fn new(expr: impl Into<PermExpr>) -> Self {
        let expr = expr.into();
        let domain_scoped = is_domain_scoped(&expr);
        Self { expr, domain_scoped }
    }

    pub fn authenticated() -> Self {
        Self::new(PermExpr::authenticated())
    }

    pub fn expr(&self) -> &PermExpr {
        &self.expr
    }

    pub fn is_domain_scoped(&self) -> bool {
        self.domain_scoped
    }
}
