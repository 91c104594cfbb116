use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use crate::authz::DomainPermission;
use crate::errors::AppError;
use crate::models::domain::{Domain, DomainRoleRecord, DomainUserRecord};

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, AppError> {
    let s = s.trim();

    // Try RFC3339 first (e.g. 2025-11-19T12:34:56Z)
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // SQLite CURRENT_TIMESTAMP format: "YYYY-MM-DD HH:MM:SS" (with optional fractional seconds)
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    if let Ok(naive_date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let ndt = naive_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| AppError::internal("invalid datetime: date out of range".to_string()))?;
        return Ok(Utc.from_utc_datetime(&ndt));
    }

    Err(AppError::internal(format!("invalid datetime: {}", s)))
}

fn parse_uuid(s: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(s.trim()).map_err(|e| AppError::internal(format!("invalid uuid: {}", e)))
}

fn get<T>(row: &SqliteRow, column: &str) -> Result<T, AppError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| AppError::internal(format!("missing {}: {}", column, e)))
}

pub fn domain_from_row(row: &SqliteRow) -> Result<Domain, AppError> {
    let id_s: String = get(row, "id")?;
    let url: String = get(row, "url")?;
    let name: String = get(row, "name")?;
    let owner_id_s: Option<String> = get(row, "owner_id")?;
    let created_at_s: String = get(row, "created_at")?;

    let id = parse_uuid(&id_s)?;
    let owner_id = match owner_id_s {
        Some(s) if !s.trim().is_empty() => Some(parse_uuid(&s)?),
        _ => None,
    };
    let created_at = parse_datetime(&created_at_s)?;

    Ok(Domain { id, url, name, owner_id, created_at })
}

pub fn domain_user_from_row(row: &SqliteRow) -> Result<DomainUserRecord, AppError> {
    let domain_id_s: String = get(row, "domain_id")?;
    let user_id_s: String = get(row, "user_id")?;
    let role: String = get(row, "role")?;

    Ok(DomainUserRecord {
        domain_id: parse_uuid(&domain_id_s)?,
        user_id: parse_uuid(&user_id_s)?,
        role,
    })
}

/// A stored permission that does not parse is an error, never a grant.
pub fn domain_role_from_row(row: &SqliteRow) -> Result<DomainRoleRecord, AppError> {
    let domain_id_s: String = get(row, "domain_id")?;
    let role: String = get(row, "role")?;
    let permission_s: String = get(row, "permission")?;

    let permission: DomainPermission = serde_json::from_str(&permission_s).map_err(|e| {
        tracing::warn!(domain_id = %domain_id_s, role = %role, error = %e, "stored role permission is malformed");
        AppError::internal(format!("invalid permission for role {}: {}", role, e))
    })?;

    Ok(DomainRoleRecord {
        domain_id: parse_uuid(&domain_id_s)?,
        role,
        permission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_timestamps() {
        let parsed = parse_datetime("2025-01-02 03:04:05").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2025-01-02T03:04:05+00:00");
        assert!(parse_datetime("2025-01-02T03:04:05Z").is_ok());
        assert!(parse_datetime("yesterday").is_err());
    }
}
