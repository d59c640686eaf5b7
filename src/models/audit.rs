//! Audit log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operations recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Muvelet {
    CreateUser,
    UpdateUser,
    DeleteUser,
    ChangePassword,
    BanUser,
    UnbanUser,
    CreateProduct,
    UpdateProduct,
    DeleteProduct,
    AdjustStock,
}

impl Muvelet {
    pub fn as_str(&self) -> &'static str {
        match self {
            Muvelet::CreateUser => "CREATE_USER",
            Muvelet::UpdateUser => "UPDATE_USER",
            Muvelet::DeleteUser => "DELETE_USER",
            Muvelet::ChangePassword => "CHANGE_PASSWORD",
            Muvelet::BanUser => "BAN_USER",
            Muvelet::UnbanUser => "UNBAN_USER",
            Muvelet::CreateProduct => "CREATE_PRODUCT",
            Muvelet::UpdateProduct => "UPDATE_PRODUCT",
            Muvelet::DeleteProduct => "DELETE_PRODUCT",
            Muvelet::AdjustStock => "ADJUST_STOCK",
        }
    }
}

impl std::fmt::Display for Muvelet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    /// Acting user, if known
    pub user_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub product_id: Option<i64>,
    pub muvelet: String,
    /// The acting or the affected user was an administrator
    pub admin: bool,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// An entry about to be written
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub user_id: Option<i64>,
    pub target_user_id: Option<i64>,
    pub product_id: Option<i64>,
    pub muvelet: Muvelet,
    pub admin: bool,
    pub details: Option<serde_json::Value>,
}

impl NewAuditEntry {
    pub fn new(muvelet: Muvelet) -> Self {
        Self {
            user_id: None,
            target_user_id: None,
            product_id: None,
            muvelet,
            admin: false,
            details: None,
        }
    }

    pub fn actor(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn target_user(mut self, user_id: i64) -> Self {
        self.target_user_id = Some(user_id);
        self
    }

    pub fn product(mut self, product_id: i64) -> Self {
        self.product_id = Some(product_id);
        self
    }

    pub fn admin(mut self, admin: bool) -> Self {
        self.admin = admin;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
