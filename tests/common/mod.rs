#![allow(dead_code)]

use anyhow::Result;
use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

use domain_authz::create_app;
use domain_authz::jwt::JwtConfig;

pub const SECRET: &str = "test-secret";

pub struct TestApp {
    pub app: Router,
    pub pool: SqlitePool,
    // keeps the database file alive
    _dir: TempDir,
}

impl TestApp {
    pub async fn spawn() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let db_path = dir.path().join("test.db");

        let opts = SqliteConnectOptions::new()
            .filename(db_path.as_path())
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await?;

        let migrator =
            sqlx::migrate::Migrator::new(std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")).await?;
        migrator.run(&pool).await?;

        std::env::set_var("JWT_SECRET", SECRET);
        let app = create_app(pool.clone()).await?;

        Ok(Self { app, pool, _dir: dir })
    }

    pub fn token(&self, user_id: Uuid, role: Option<&str>) -> Result<String> {
        Ok(JwtConfig::new(SECRET, 1).encode(user_id, role)?)
    }

    pub async fn add_domain(&self, url: &str) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO domains (id, url, name) VALUES (?, ?, ?)")
            .bind(id.to_string())
            .bind(url)
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn add_member(&self, domain_id: Uuid, user_id: Uuid, role: &str) -> Result<()> {
        sqlx::query("INSERT INTO domain_users (domain_id, user_id, role) VALUES (?, ?, ?)")
            .bind(domain_id.to_string())
            .bind(user_id.to_string())
            .bind(role)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn add_role(&self, domain_id: Uuid, role: &str, permission: Value) -> Result<()> {
        sqlx::query("INSERT INTO domain_roles (domain_id, role, permission) VALUES (?, ?, ?)")
            .bind(domain_id.to_string())
            .bind(role)
            .bind(permission.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Result<(StatusCode, Value)> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty())?).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Result<(StatusCode, Value)> {
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))?;
        self.send(req).await
    }

    async fn send(&self, req: Request<Body>) -> Result<(StatusCode, Value)> {
        let resp = self.app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), 10_485_760).await?;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, value))
    }
}
