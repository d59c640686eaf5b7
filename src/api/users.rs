//! User management API endpoints
//!
//! Every user leaving these handlers goes through [`PublicUser`].

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};

use crate::{
    db::{NewUser, UserRepository},
    middleware::Actor,
    models::{
        ChangePasswordRequest, CreateUserRequest, Muvelet, NewAuditEntry, PublicUser,
        UpdateUserRequest,
    },
    services::password,
    utils::{AppError, AppResult, ValidatedJson},
    AppState,
};

use super::{audit_logs::record, parse_id};

/// Create routes for user management
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/{id}/password", put(change_password))
}

fn unique_username(e: anyhow::Error) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => AppError::conflict("Username already taken"),
        other => other,
    }
}

/// List all users
async fn list_users(State(state): State<AppState>) -> AppResult<Json<Vec<PublicUser>>> {
    let users = UserRepository::new(&state.db).list().await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

/// Get a specific user
async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<PublicUser>> {
    let id = parse_id(&id, "user")?;
    let user = UserRepository::new(&state.db)
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))?;

    Ok(Json(user.into()))
}

/// Create a new user
async fn create_user(
    State(state): State<AppState>,
    actor: Actor,
    ValidatedJson(payload): ValidatedJson<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<PublicUser>)> {
    let jelszo = password::hash_password(&payload.jelszo)?;

    let user = UserRepository::new(&state.db)
        .create(&NewUser {
            nev: payload.nev,
            felhasznalonev: payload.felhasznalonev,
            email: payload.email,
            telefonszam: payload.telefonszam,
            rang: payload.rang,
            must_change_password: false,
            jelszo,
        })
        .await
        .map_err(unique_username)?;

    tracing::info!(user_id = user.id, actor = ?actor.id(), "User created");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::CreateUser)
            .actor(actor.id())
            .target_user(user.id)
            .admin(actor.is_admin() || user.is_admin())
            .details(serde_json::json!({
                "felhasznalonev": user.felhasznalonev,
                "rang": user.rang,
            })),
    )
    .await;

    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update a user
async fn update_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<PublicUser>> {
    let id = parse_id(&id, "user")?;
    if payload.is_empty() {
        return Err(AppError::bad_request("No fields to update"));
    }

    let repo = UserRepository::new(&state.db);
    let before = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))?;

    let user = repo
        .update(id, &payload)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))?;

    tracing::info!(user_id = id, actor = ?actor.id(), "User updated");

    let admin = actor.is_admin() || before.is_admin() || user.is_admin();
    record(
        &state.db,
        NewAuditEntry::new(Muvelet::UpdateUser)
            .actor(actor.id())
            .target_user(id)
            .admin(admin)
            .details(serde_json::json!({ "user": PublicUser::from(&user) })),
    )
    .await;

    if before.is_banned != user.is_banned {
        let muvelet = if user.is_banned {
            Muvelet::BanUser
        } else {
            Muvelet::UnbanUser
        };
        tracing::info!(user_id = id, muvelet = %muvelet, "Ban status changed");
        record(
            &state.db,
            NewAuditEntry::new(muvelet)
                .actor(actor.id())
                .target_user(id)
                .admin(admin),
        )
        .await;
    }

    Ok(Json(user.into()))
}

/// Replace a user's password
async fn change_password(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<PublicUser>> {
    let id = parse_id(&id, "user")?;
    let jelszo = password::hash_password(&payload.jelszo)?;

    let user = UserRepository::new(&state.db)
        .change_password(id, &jelszo)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))?;

    tracing::info!(user_id = id, actor = ?actor.id(), "Password changed");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::ChangePassword)
            .actor(actor.id())
            .target_user(id)
            .admin(actor.is_admin() || user.is_admin()),
    )
    .await;

    Ok(Json(user.into()))
}

/// Delete a user
async fn delete_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let id = parse_id(&id, "user")?;
    let repo = UserRepository::new(&state.db);
    let user = repo
        .get_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {} not found", id)))?;

    if !repo.delete(id).await? {
        return Err(AppError::not_found(format!("User {} not found", id)));
    }

    tracing::info!(user_id = id, actor = ?actor.id(), "User deleted");

    record(
        &state.db,
        NewAuditEntry::new(Muvelet::DeleteUser)
            .actor(actor.id())
            .target_user(id)
            .admin(actor.is_admin() || user.is_admin())
            .details(serde_json::json!({ "felhasznalonev": user.felhasznalonev })),
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}
