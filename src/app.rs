use std::sync::Arc;

use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::authz::{Authorizer, GeneralPermission, PermissionTables, Requirement};
use crate::db::SqliteMembershipStore;
use crate::docs;
use crate::errors::AppError;
use crate::jwt::JwtConfig;
use crate::routes::{auth, domains, health};

/// Requirements of the routes that declare one up front.
#[derive(Debug, Clone)]
pub struct RouteRequirements {
    pub me: Requirement,
    pub domain_permission: Requirement,
    pub domain_roles: Requirement,
}

impl RouteRequirements {
    pub fn declare() -> Self {
        Self {
            me: Requirement::authenticated(),
            domain_permission: Requirement::authenticated(),
            domain_roles: Requirement::new(GeneralPermission::EDIT_PERMISSION),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub jwt: Arc<JwtConfig>,
    pub authorizer: Authorizer,
    pub requirements: Arc<RouteRequirements>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt: JwtConfig) -> Self {
        let tables = Arc::new(PermissionTables::build());
        let store = Arc::new(SqliteMembershipStore::new(pool.clone()));

        Self {
            pool,
            jwt: Arc::new(jwt),
            authorizer: Authorizer::new(tables, store),
            requirements: Arc::new(RouteRequirements::declare()),
        }
    }
}

pub async fn create_app(pool: SqlitePool) -> Result<Router, AppError> {
    let jwt_config = JwtConfig::from_env()?;
    let state = AppState::new(pool, jwt_config);

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    let auth_routes = Router::new().route("/me", get(auth::me));

    let domain_routes = Router::new()
        .route("/permission", get(domains::get_permission))
        .route("/roles", get(domains::list_roles))
        .route("/check", post(domains::check))
        .route("/ensure", post(domains::ensure));

    let router = Router::new()
        .route("/api/health", get(health::health))
        .route("/api-docs/openapi.json", get(docs::openapi_json))
        .nest("/auth", auth_routes)
        .nest("/domains/:domain", domain_routes)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    Ok(router)
}
