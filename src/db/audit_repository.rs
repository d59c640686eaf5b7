//! Audit log repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::{AuditLogEntry, LogFilter, NewAuditEntry};

use super::{format_bound, now_timestamp, parse_db_timestamp};

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: i64,
    user_id: Option<i64>,
    target_user_id: Option<i64>,
    product_id: Option<i64>,
    muvelet: String,
    admin: bool,
    details: Option<String>,
    created_at: String,
}

pub struct AuditRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &NewAuditEntry) -> Result<AuditLogEntry> {
        let created_at = now_timestamp();
        let details_str = entry.details.as_ref().map(|d| d.to_string());

        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, target_user_id, product_id, muvelet, admin, details, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.target_user_id)
        .bind(entry.product_id)
        .bind(entry.muvelet.as_str())
        .bind(entry.admin)
        .bind(details_str.as_deref())
        .bind(&created_at)
        .execute(self.pool)
        .await
        .context("Failed to insert audit log entry")?;

        Ok(AuditLogEntry {
            id: result.last_insert_rowid(),
            user_id: entry.user_id,
            target_user_id: entry.target_user_id,
            product_id: entry.product_id,
            muvelet: entry.muvelet.as_str().to_string(),
            admin: entry.admin,
            details: entry.details.clone(),
            created_at: parse_db_timestamp(&created_at)?,
        })
    }

    /// Entries matching every constraint present in `filter`, newest first
    pub async fn list(&self, filter: &LogFilter, limit: u32) -> Result<Vec<AuditLogEntry>> {
        // No stored entry can lie past year 9999
        let window_start = match filter.window_start() {
            Some(ts) => match format_bound(ts) {
                Some(bound) => Some(bound),
                None => return Ok(Vec::new()),
            },
            None => None,
        };
        let window_end = filter.window_end().and_then(format_bound);

        let mut sql = String::from(
            "SELECT id, user_id, target_user_id, product_id, muvelet, admin, details, created_at FROM audit_logs WHERE 1 = 1",
        );

        if filter.target_user_id().is_some() {
            sql.push_str(" AND target_user_id = ?");
        }
        if filter.operation().is_some() {
            sql.push_str(" AND muvelet = ?");
        }
        if filter.product_id().is_some() {
            sql.push_str(" AND product_id = ?");
        }
        if window_start.is_some() {
            sql.push_str(" AND created_at >= ?");
        }
        if window_end.is_some() {
            sql.push_str(" AND created_at < ?");
        }
        if filter.admin().is_some() {
            sql.push_str(" AND admin = ?");
        }

        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT ?");

        let mut q = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(target_user_id) = filter.target_user_id() {
            q = q.bind(target_user_id);
        }
        if let Some(operation) = filter.operation() {
            q = q.bind(operation);
        }
        if let Some(product_id) = filter.product_id() {
            q = q.bind(product_id);
        }
        if let Some(ref start) = window_start {
            q = q.bind(start);
        }
        if let Some(ref end) = window_end {
            q = q.bind(end);
        }
        if let Some(admin) = filter.admin() {
            q = q.bind(admin);
        }
        q = q.bind(i64::from(limit));

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list audit logs")?;

        rows.into_iter().map(row_to_audit).collect()
    }
}

fn row_to_audit(row: AuditRow) -> Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: row.id,
        user_id: row.user_id,
        target_user_id: row.target_user_id,
        product_id: row.product_id,
        muvelet: row.muvelet,
        admin: row.admin,
        details: row.details.and_then(|s| serde_json::from_str(&s).ok()),
        created_at: parse_db_timestamp(&row.created_at)?,
    })
}
