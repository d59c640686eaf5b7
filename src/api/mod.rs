//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{routing::get, Router};

use crate::{utils::AppError, AppState};

mod audit_logs;
mod health;
mod products;
mod users;

pub use health::*;

/// All API routes, mounted by the caller under `/api/v1`
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health check endpoints
        .route("/health", get(health::health_check))
        .route("/health/detailed", get(health::health_check_detailed))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        // Resource endpoints
        .nest("/users", users::routes())
        .nest("/products", products::routes())
        .nest("/logs", audit_logs::routes())
}

/// Parse a numeric path id, rejecting anything else with the JSON error body
fn parse_id(raw: &str, what: &str) -> Result<i64, AppError> {
    raw.parse::<i64>()
        .map_err(|_| AppError::bad_request(format!("Invalid {} ID: {}", what, raw)))
}
