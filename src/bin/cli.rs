use std::collections::HashSet;
use std::path::Path;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use domain_authz::authz::{
    AuthContext, DefaultPolicyEvaluator, DefaultRole, Identity, PermExpr, PermissionTables, PolicyEvaluator,
};
use domain_authz::jwt::JwtConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "domain-authz operator tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Mint an identity token signed with JWT_SECRET
    IssueToken {
        #[arg(long)]
        sub: Uuid,
        #[arg(long)]
        role: Option<String>,
    },
    /// Print a built-in role's default permission as JSON
    Defaults {
        #[arg(long, default_value = "user")]
        role: String,
        /// Print the site-level entry instead of the domain-level one
        #[arg(long)]
        site: bool,
    },
    /// Evaluate a JSON requirement against a site role
    Explain {
        #[arg(long, default_value = "guest")]
        role: String,
        requirement: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Try to load env from CWD; when running in Docker the binary CWD may differ,
    // so fall back to the crate-local `.env` using CARGO_MANIFEST_DIR.
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();

    match cli.command {
        Commands::MigrateRun => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            migrator.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = get_pool().await?;
            let migrator = get_migrator().await?;
            print_status(&pool, &migrator).await?;
        }
        Commands::IssueToken { sub, role } => {
            let jwt = JwtConfig::from_env()?;
            println!("{}", jwt.encode(sub, role.as_deref())?);
        }
        Commands::Defaults { role, site } => {
            let role: DefaultRole = role
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown built-in role: {role}"))?;
            let tables = PermissionTables::build();
            let json = if site {
                serde_json::to_string_pretty(&tables.site_or_guest(role))?
            } else {
                let permission = tables
                    .domain(role)
                    .with_context(|| format!("{role} has no domain-level default"))?;
                serde_json::to_string_pretty(permission)?
            };
            println!("{json}");
        }
        Commands::Explain { role, requirement } => {
            let value: serde_json::Value =
                serde_json::from_str(&requirement).context("requirement must be JSON")?;
            let expr = PermExpr::from_json(&value)?;
            let tables = PermissionTables::build();
            let ctx = AuthContext::site(&tables, &Identity::new(Uuid::nil()).with_role(role));

            println!("requirement: {expr}");
            println!("site role:   {}", ctx.site_role);
            match DefaultPolicyEvaluator::new().evaluate(&ctx, &expr) {
                None => println!("decision:    allowed"),
                Some(key) => println!("decision:    denied by {key}"),
            }
        }
    }

    Ok(())
}

async fn get_pool() -> anyhow::Result<SqlitePool> {
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to database")
}

async fn print_status(pool: &SqlitePool, migrator: &sqlx::migrate::Migrator) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let db_applied = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?;
    let applied_versions: HashSet<i64> = if db_applied.is_some() {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in migrator.iter() {
        let version = migration.version;
        let status = if applied_versions.contains(&version) { "applied" } else { "pending" };
        let desc = migration.description.as_ref().trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, version, name);
    }

    Ok(())
}

async fn get_migrator() -> anyhow::Result<sqlx::migrate::Migrator> {
    // Try local ./migrations first (when running from repo root), then the
    // crate-local migrations folder.
    let local = Path::new("./migrations");
    let migrator_path = if local.exists() {
        local.to_path_buf()
    } else {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations")
    };

    let migrator_path_display = migrator_path.display().to_string();
    sqlx::migrate::Migrator::new(migrator_path)
        .await
        .with_context(|| format!("failed to load migrations from {}", migrator_path_display))
}
