//! Acting user resolution
//!
//! The caller identifies itself with an optional `X-User-Id` header. Handlers
//! that mutate data take an [`Actor`] so the audit log can record who did it.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{db::UserRepository, models::User, utils::AppError, AppState};

/// Header naming the acting user
pub const ACTOR_HEADER: &str = "x-user-id";

/// The user on whose behalf the request runs, if any
#[derive(Debug, Clone, Default)]
pub struct Actor(pub Option<User>);

impl Actor {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(User::is_admin)
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(raw) = parts.headers.get(ACTOR_HEADER) else {
            return Ok(Actor(None));
        };

        let id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| AppError::bad_request("X-User-Id must be an integer user id"))?;

        let user = UserRepository::new(&state.db)
            .get_by_id(id)
            .await?
            .ok_or_else(|| AppError::bad_request(format!("Unknown acting user: {}", id)))?;

        if user.is_banned {
            return Err(AppError::forbidden(format!("User {} is banned", id)));
        }

        Ok(Actor(Some(user)))
    }
}
