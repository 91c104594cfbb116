//! Permission expressions: atomic `(scope, permission)` keys combined into
//! AND/OR trees.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use super::scope::{PermissionType, ScopeType};

/// A malformed permission expression. Raised when a requirement is declared,
/// never while a request is being evaluated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("permission composite must not be empty")]
    EmptyComposite,
    #[error("unrecognized permission expression: {0}")]
    UnrecognizedShape(String),
    #[error("unknown scope '{0}'")]
    UnknownScope(String),
    #[error("unknown permission '{0}'")]
    UnknownPermission(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct PermKey {
    pub scope: ScopeType,
    pub permission: PermissionType,
}

impl PermKey {
    pub const UNKNOWN: PermKey = PermKey::new(ScopeType::Unknown, PermissionType::Unknown);

    pub const fn new(scope: ScopeType, permission: PermissionType) -> Self {
        Self { scope, permission }
    }
}

impl fmt::Display for PermKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.scope, self.permission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    And,
    Or,
}

impl Action {
    fn symbol(&self) -> &'static str {
        match self {
            Action::And => " & ",
            Action::Or => " | ",
        }
    }
}

/// AND/OR node. Always holds at least one child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermCompose {
    permissions: Vec<PermExpr>,
    action: Action,
}

impl PermCompose {
    pub fn new(permissions: Vec<PermExpr>, action: Action) -> Result<Self, DefinitionError> {
        if permissions.is_empty() {
            return Err(DefinitionError::EmptyComposite);
        }
        Ok(Self { permissions, action })
    }

    pub fn permissions(&self) -> &[PermExpr] {
        &self.permissions
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// A singleton node can be spliced into a parent of either combinator.
    fn splices_into(&self, action: Action) -> bool {
        self.action == action || self.permissions.len() == 1
    }
}

/// A declared permission requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermExpr {
    /// No permission beyond being authenticated. Always passes.
    Authenticated,
    Key(PermKey),
    Compose(PermCompose),
}

impl PermExpr {
    pub fn authenticated() -> Self {
        PermExpr::Authenticated
    }

    pub fn from_pair(scope: ScopeType, permission: PermissionType) -> Self {
        PermExpr::Key(PermKey::new(scope, permission))
    }

    /// Builds a composite over `items`. Nested composites are built by the
    /// caller and passed in as items.
    pub fn from_list<I, T>(items: I, action: Action) -> Result<Self, DefinitionError>
    where
        I: IntoIterator<Item = T>,
        T: Into<PermExpr>,
    {
        let permissions = items.into_iter().map(Into::into).collect();
        PermCompose::new(permissions, action).map(PermExpr::Compose)
    }

    pub fn from_expr(expr: impl Into<PermExpr>) -> Self {
        expr.into()
    }

    /// Parses the JSON requirement notation:
    ///
    /// - `null` / `[]`: authenticated only
    /// - `["domain_problem", "view"]` or `"domain_problem.view"`: one key
    /// - `[expr, expr, ...]`: AND of the items
    /// - `{"and": [...]}` / `{"or": [...]}`: explicit combinator
    pub fn from_json(value: &Value) -> Result<Self, DefinitionError> {
        match value {
            Value::Null => Ok(PermExpr::Authenticated),
            Value::Array(items) if items.is_empty() => Ok(PermExpr::Authenticated),
            other => parse_node(other),
        }
    }

    fn combine(self, other: PermExpr, action: Action) -> PermExpr {
        match (self, other) {
            (PermExpr::Authenticated, rest) | (rest, PermExpr::Authenticated) => match action {
                Action::And => rest,
                Action::Or => PermExpr::Authenticated,
            },
            (lhs, rhs) => {
                let permissions = if lhs.splices_into(action) && rhs.splices_into(action) {
                    let mut children = lhs.into_children();
                    children.extend(rhs.into_children());
                    children
                } else {
                    vec![lhs, rhs]
                };
                PermExpr::Compose(PermCompose { permissions, action })
            }
        }
    }

    fn splices_into(&self, action: Action) -> bool {
        match self {
            PermExpr::Authenticated => false,
            PermExpr::Key(_) => true,
            PermExpr::Compose(compose) => compose.splices_into(action),
        }
    }

    fn into_children(self) -> Vec<PermExpr> {
        match self {
            PermExpr::Compose(compose) => compose.permissions,
            other => vec![other],
        }
    }
}

fn parse_node(value: &Value) -> Result<PermExpr, DefinitionError> {
    match value {
        Value::String(dotted) => parse_dotted(dotted),
        Value::Array(items) => {
            if let Some(key) = parse_pair(items)? {
                return Ok(PermExpr::Key(key));
            }
            parse_list(items, Action::And)
        }
        Value::Object(map) if map.len() == 1 => {
            let (name, items) = map
                .iter()
                .next()
                .ok_or_else(|| DefinitionError::UnrecognizedShape(value.to_string()))?;
            let action = match name.as_str() {
                "and" => Action::And,
                "or" => Action::Or,
                _ => return Err(DefinitionError::UnrecognizedShape(value.to_string())),
            };
            match items {
                Value::Array(items) => parse_list(items, action),
                _ => Err(DefinitionError::UnrecognizedShape(value.to_string())),
            }
        }
        other => Err(DefinitionError::UnrecognizedShape(other.to_string())),
    }
}

/// `["scope", "permission"]`, but only when the first item names a scope so a
/// list of two dotted keys is not mistaken for a pair.
fn parse_pair(items: &[Value]) -> Result<Option<PermKey>, DefinitionError> {
    let [Value::String(scope), Value::String(permission)] = items else {
        return Ok(None);
    };
    let Ok(scope) = scope.parse::<ScopeType>() else {
        return Ok(None);
    };
    Ok(Some(PermKey::new(scope, permission.parse()?)))
}

fn parse_dotted(value: &str) -> Result<PermExpr, DefinitionError> {
    let (scope, permission) = value
        .split_once('.')
        .ok_or_else(|| DefinitionError::UnrecognizedShape(format!("\"{value}\"")))?;
    Ok(PermExpr::from_pair(scope.parse()?, permission.parse()?))
}

fn parse_list(items: &[Value], action: Action) -> Result<PermExpr, DefinitionError> {
    let permissions = items.iter().map(parse_node).collect::<Result<Vec<_>, _>>()?;
    PermCompose::new(permissions, action).map(PermExpr::Compose)
}

impl From<PermKey> for PermExpr {
    fn from(key: PermKey) -> Self {
        PermExpr::Key(key)
    }
}

impl From<PermCompose> for PermExpr {
    fn from(compose: PermCompose) -> Self {
        PermExpr::Compose(compose)
    }
}

impl<T: Into<PermExpr>> BitAnd<T> for PermExpr {
    type Output = PermExpr;

    fn bitand(self, rhs: T) -> PermExpr {
        self.combine(rhs.into(), Action::And)
    }
}

impl<T: Into<PermExpr>> BitOr<T> for PermExpr {
    type Output = PermExpr;

    fn bitor(self, rhs: T) -> PermExpr {
        self.combine(rhs.into(), Action::Or)
    }
}

impl<T: Into<PermExpr>> BitAnd<T> for PermKey {
    type Output = PermExpr;

    fn bitand(self, rhs: T) -> PermExpr {
        PermExpr::Key(self) & rhs
    }
}

impl<T: Into<PermExpr>> BitOr<T> for PermKey {
    type Output = PermExpr;

    fn bitor(self, rhs: T) -> PermExpr {
        PermExpr::Key(self) | rhs
    }
}

impl fmt::Display for PermExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermExpr::Authenticated => f.write_str("authenticated"),
            PermExpr::Key(key) => key.fmt(f),
            PermExpr::Compose(compose) => {
                f.write_str("(")?;
                for (index, child) in compose.permissions.iter().enumerate() {
                    if index > 0 {
                        f.write_str(compose.action.symbol())?;
                    }
                    child.fmt(f)?;
                }
                f.write_str(")")
            }
        }
    }
}
