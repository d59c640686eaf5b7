//! User account repository

use anyhow::{Context, Result};
use sqlx::SqlitePool;

use crate::models::{Rang, UpdateUserRequest, User};

use super::now_timestamp;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i64,
    nev: String,
    felhasznalonev: String,
    email: Option<String>,
    telefonszam: Option<String>,
    rang: String,
    is_banned: bool,
    must_change_password: bool,
    jelszo: String,
    current_token_version: i64,
}

/// Account data for an insert; `jelszo` is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub nev: String,
    pub felhasznalonev: String,
    pub email: Option<String>,
    pub telefonszam: Option<String>,
    pub rang: Rang,
    pub must_change_password: bool,
    pub jelszo: String,
}

const USER_COLUMNS: &str = "id, nev, felhasznalonev, email, telefonszam, rang, is_banned, \
     must_change_password, jelszo, current_token_version";

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(self.pool)
            .await
            .context("Failed to list users")?;

        rows.into_iter().map(row_to_user).collect()
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to get user")?;

        row.map(row_to_user).transpose()
    }

    pub async fn get_by_username(&self, felhasznalonev: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE felhasznalonev = ?", USER_COLUMNS);
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(felhasznalonev)
            .fetch_optional(self.pool)
            .await
            .context("Failed to get user by username")?;

        row.map(row_to_user).transpose()
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .context("Failed to count users")?;
        Ok(count)
    }

    pub async fn create(&self, user: &NewUser) -> Result<User> {
        let now = now_timestamp();

        let result = sqlx::query(
            r#"
            INSERT INTO users (nev, felhasznalonev, email, telefonszam, rang, is_banned,
                               must_change_password, jelszo, current_token_version,
                               created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, 0, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&user.nev)
        .bind(&user.felhasznalonev)
        .bind(&user.email)
        .bind(&user.telefonszam)
        .bind(user.rang.as_str())
        .bind(user.must_change_password)
        .bind(&user.jelszo)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create user")?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .context("Failed to retrieve created user")
    }

    pub async fn update(&self, id: i64, req: &UpdateUserRequest) -> Result<Option<User>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let nev = req.nev.clone().unwrap_or(existing.nev);
        let email = req.email.clone().or(existing.email);
        let telefonszam = req.telefonszam.clone().or(existing.telefonszam);
        let rang = req.rang.unwrap_or(existing.rang);
        let is_banned = req.is_banned.unwrap_or(existing.is_banned);
        let must_change_password = req
            .must_change_password
            .unwrap_or(existing.must_change_password);

        sqlx::query(
            r#"
            UPDATE users
            SET nev = ?, email = ?, telefonszam = ?, rang = ?, is_banned = ?,
                must_change_password = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&nev)
        .bind(&email)
        .bind(&telefonszam)
        .bind(rang.as_str())
        .bind(is_banned)
        .bind(must_change_password)
        .bind(now_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to update user")?;

        self.get_by_id(id).await
    }

    /// Store a new password hash and invalidate sessions issued for the old one
    pub async fn change_password(&self, id: i64, jelszo_hash: &str) -> Result<Option<User>> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET jelszo = ?, current_token_version = current_token_version + 1,
                must_change_password = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(jelszo_hash)
        .bind(now_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to change password")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

fn row_to_user(row: UserRow) -> Result<User> {
    let rang = row
        .rang
        .parse::<Rang>()
        .map_err(|e| anyhow::anyhow!("Corrupt user row {}: {}", row.id, e))?;

    Ok(User {
        id: row.id,
        nev: row.nev,
        felhasznalonev: row.felhasznalonev,
        email: row.email,
        telefonszam: row.telefonszam,
        rang,
        is_banned: row.is_banned,
        must_change_password: row.must_change_password,
        jelszo: row.jelszo,
        current_token_version: row.current_token_version,
    })
}
