//! Domain-level authorization endpoints.
//!
//! Every handler resolves the caller's domain context from the `:domain`
//! path token (url slug or id) before evaluating anything.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::app::AppState;
use crate::authz::{AuthContext, PermExpr, PermKey, PolicyEvaluator};
use crate::errors::{AppError, AppResult};
use crate::jwt::AuthUser;
use crate::models::domain::DomainRoleRecord;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckRequest {
    /// Requirement in JSON notation, e.g. `{"or": [["domain_problem", "edit"], "domain_problem.view_hidden"]}`.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub requirement: Value,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckResponse {
    pub allowed: bool,
    /// The key that denied the requirement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied: Option<PermKey>,
}

#[utoipa::path(
    get,
    path = "/domains/{domain}/permission",
    tag = "Domains",
    params(("domain" = String, Path, description = "Domain url or id")),
    responses(
        (status = 200, description = "Domain role and permission of the caller", body = AuthContext),
        (status = 404, description = "Domain not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn get_permission(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(domain): Path<String>,
) -> AppResult<Json<AuthContext>> {
    let ctx = state
        .authorizer
        .authorize(&auth.identity, Some(&domain), &state.requirements.domain_permission)
        .await?;
    Ok(Json(ctx))
}

#[utoipa::path(
    get,
    path = "/domains/{domain}/roles",
    tag = "Domains",
    params(("domain" = String, Path, description = "Domain url or id")),
    responses(
        (status = 200, description = "Role overrides stored for the domain", body = Vec<DomainRoleRecord>),
        (status = 403, description = "Missing domain_general edit_permission"),
        (status = 404, description = "Domain not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn list_roles(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(domain): Path<String>,
) -> AppResult<Json<Vec<DomainRoleRecord>>> {
    let ctx = state
        .authorizer
        .authorize(&auth.identity, Some(&domain), &state.requirements.domain_roles)
        .await?;

    let domain = ctx
        .domain
        .ok_or_else(|| AppError::internal("domain context without a domain"))?;
    let roles = state.authorizer.store().list_domain_roles(domain.id).await?;
    Ok(Json(roles))
}

#[utoipa::path(
    post,
    path = "/domains/{domain}/check",
    tag = "Domains",
    params(("domain" = String, Path, description = "Domain url or id")),
    request_body = CheckRequest,
    responses(
        (status = 200, description = "Decision for the requirement", body = CheckResponse),
        (status = 400, description = "Malformed requirement"),
        (status = 404, description = "Domain not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn check(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(domain): Path<String>,
    Json(req): Json<CheckRequest>,
) -> AppResult<Json<CheckResponse>> {
    let expr = PermExpr::from_json(&req.requirement)?;
    let ctx = state.authorizer.domain_context(&auth.identity, &domain).await?;
    let denied = state.authorizer.evaluate(&ctx, &expr);

    Ok(Json(CheckResponse {
        allowed: denied.is_none(),
        denied,
    }))
}

#[utoipa::path(
    post,
    path = "/domains/{domain}/ensure",
    tag = "Domains",
    params(("domain" = String, Path, description = "Domain url or id")),
    request_body = CheckRequest,
    responses(
        (status = 204, description = "Requirement satisfied"),
        (status = 400, description = "Malformed requirement"),
        (status = 403, description = "Requirement denied"),
        (status = 404, description = "Domain not found")
    ),
    security(("bearerAuth" = []))
)]
pub async fn ensure(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(domain): Path<String>,
    Json(req): Json<CheckRequest>,
) -> AppResult<StatusCode> {
    let expr = PermExpr::from_json(&req.requirement)?;
    let ctx = state.authorizer.domain_context(&auth.identity, &domain).await?;
    state.authorizer.evaluator().ensure(&ctx, &expr)?;
    Ok(StatusCode::NO_CONTENT)
}
