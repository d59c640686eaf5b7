//! User model
//!
//! [`User`] is the stored record and carries the credential fields. It has no
//! serialization path. Anything leaving the process goes through
//! [`PublicUser`], which is built from a `User` and cannot hold secrets.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::{validate_phone, validate_username};

/// Access level of a user account
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Rang {
    #[default]
    User,
    Admin,
}

impl Rang {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rang::User => "USER",
            Rang::Admin => "ADMIN",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Rang::Admin)
    }
}

impl std::fmt::Display for Rang {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Rang {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Rang::User),
            "ADMIN" => Ok(Rang::Admin),
            _ => Err(format!("Invalid rang: {}", s)),
        }
    }
}

/// Stored user record, including credentials
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub nev: String,
    pub felhasznalonev: String,
    pub email: Option<String>,
    pub telefonszam: Option<String>,
    pub rang: Rang,
    pub is_banned: bool,
    pub must_change_password: bool,
    /// Argon2 PHC string
    pub jelszo: String,
    /// Bumped whenever previously issued sessions must stop working
    pub current_token_version: i64,
}

impl User {
    /// Redacted copy for responses
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            nev: self.nev.clone(),
            felhasznalonev: self.felhasznalonev.clone(),
            email: self.email.clone(),
            telefonszam: self.telefonszam.clone(),
            rang: self.rang,
            is_banned: self.is_banned,
            must_change_password: self.must_change_password,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.rang.is_admin()
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("nev", &self.nev)
            .field("felhasznalonev", &self.felhasznalonev)
            .field("email", &self.email)
            .field("telefonszam", &self.telefonszam)
            .field("rang", &self.rang)
            .field("is_banned", &self.is_banned)
            .field("must_change_password", &self.must_change_password)
            .field("jelszo", &"[redacted]")
            .field("current_token_version", &"[redacted]")
            .finish()
    }
}

/// User without credentials, safe to serialize
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub nev: String,
    pub felhasznalonev: String,
    pub email: Option<String>,
    pub telefonszam: Option<String>,
    pub rang: Rang,
    pub is_banned: bool,
    pub must_change_password: bool,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            nev: user.nev,
            felhasznalonev: user.felhasznalonev,
            email: user.email,
            telefonszam: user.telefonszam,
            rang: user.rang,
            is_banned: user.is_banned,
            must_change_password: user.must_change_password,
        }
    }
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        user.to_public()
    }
}

/// Request to create a new user
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub nev: String,
    #[validate(custom(function = "validate_username"))]
    pub felhasznalonev: String,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub telefonszam: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub jelszo: String,
    #[serde(default)]
    pub rang: Rang,
}

/// Request to update a user; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 100))]
    pub nev: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(custom(function = "validate_phone"))]
    pub telefonszam: Option<String>,
    pub rang: Option<Rang>,
    pub is_banned: Option<bool>,
    pub must_change_password: Option<bool>,
}

impl UpdateUserRequest {
    pub fn is_empty(&self) -> bool {
        self.nev.is_none()
            && self.email.is_none()
            && self.telefonszam.is_none()
            && self.rang.is_none()
            && self.is_banned.is_none()
            && self.must_change_password.is_none()
    }
}

/// Request to replace a user's password
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 8, max = 128))]
    pub jelszo: String,
}
