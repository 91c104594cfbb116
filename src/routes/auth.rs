use axum::extract::State;
use axum::Json;

use crate::app::AppState;
use crate::authz::AuthContext;
use crate::errors::AppResult;
use crate::jwt::AuthUser;

/// Site-level context of the caller.
#[utoipa::path(
    get,
    path = "/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Site role and permission of the caller", body = AuthContext),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> AppResult<Json<AuthContext>> {
    let ctx = state
        .authorizer
        .authorize(&auth.identity, None, &state.requirements.me)
        .await?;
    Ok(Json(ctx))
}
