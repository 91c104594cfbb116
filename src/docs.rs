use axum::Json;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::authz;
use crate::models;
use crate::routes;

#[derive(OpenApi)]
#[openapi(
	paths(
		routes::health::health,
		routes::auth::me,
		routes::domains::get_permission,
		routes::domains::list_roles,
		routes::domains::check,
		routes::domains::ensure
	),
	components(
		schemas(
			routes::health::HealthResponse,
			routes::domains::CheckRequest,
			routes::domains::CheckResponse,
			authz::AuthContext,
			authz::DefaultRole,
			authz::PermKey,
			authz::ScopeType,
			authz::PermissionType,
			authz::SitePermission,
			authz::DomainPermission,
			authz::GeneralPermission,
			authz::ProblemPermission,
			authz::ProblemSetPermission,
			authz::RecordPermission,
			authz::SiteUserPermission,
			authz::SiteDomainPermission,
			models::domain::Domain,
			models::domain::DomainRoleRecord
		)
	),
	modifiers(&BearerAuth),
	tags(
		(name = "Health", description = "Service health"),
		(name = "Auth", description = "Caller identity and site permission"),
		(name = "Domains", description = "Domain permission resolution and checks")
	)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
	fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
		if let Some(components) = openapi.components.as_mut() {
			components.add_security_scheme(
				"bearerAuth",
				SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
			);
		}
	}
}

pub fn build_openapi() -> utoipa::openapi::OpenApi {
	ApiDoc::openapi()
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
	Json(build_openapi())
}
