//! Audit log API endpoints

use axum::{extract::State, routing::get, Json, Router};

use crate::{
    db::{AuditRepository, DbPool},
    models::{log_filter, AuditLogEntry, NewAuditEntry},
    utils::{AppResult, RawQuery},
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

/// Query the audit log.
///
/// The query string is normalized first; any unknown, repeated or malformed
/// parameter rejects the whole request before storage is touched.
async fn list_audit_logs(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    let filter = log_filter::normalize(&raw)?;
    tracing::debug!(filter = ?filter, "Listing audit logs");

    let logs = AuditRepository::new(&state.db)
        .list(&filter, state.config.audit.max_results)
        .await?;

    Ok(Json(logs))
}

/// Write an audit entry after a mutation has already succeeded.
///
/// A failed write is logged and does not fail the request.
pub(crate) async fn record(db: &DbPool, entry: NewAuditEntry) {
    if let Err(e) = AuditRepository::new(db).insert(&entry).await {
        tracing::warn!(muvelet = %entry.muvelet, error = %e, "Failed to write audit log entry");
    }
}
