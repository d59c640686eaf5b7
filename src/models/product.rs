//! Product models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::utils::validation::validate_sku;

/// Largest quantity a product may hold
pub const MAX_STOCK: i64 = 1_000_000_000_000;

/// Largest unit price accepted
pub const MAX_PRICE: i64 = 1_000_000_000_000;

/// A stocked article
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub nev: String,
    /// Article number, unique
    pub cikkszam: String,
    pub leiras: Option<String>,
    /// Units on hand, never negative
    pub mennyiseg: i64,
    /// Unit price in minor currency units
    pub ar: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub nev: String,
    #[validate(custom(function = "validate_sku"))]
    pub cikkszam: String,
    #[validate(length(max = 2000))]
    pub leiras: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, max = MAX_STOCK))]
    pub mennyiseg: i64,
    #[validate(range(min = 0, max = MAX_PRICE))]
    pub ar: i64,
}

/// Partial product update; stock is changed through [`StockAdjustmentRequest`]
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub nev: Option<String>,
    #[validate(custom(function = "validate_sku"))]
    pub cikkszam: Option<String>,
    #[validate(length(max = 2000))]
    pub leiras: Option<String>,
    #[validate(range(min = 0, max = MAX_PRICE))]
    pub ar: Option<i64>,
}

impl UpdateProductRequest {
    pub fn is_empty(&self) -> bool {
        self.nev.is_none() && self.cikkszam.is_none() && self.leiras.is_none() && self.ar.is_none()
    }
}

/// Relative stock change, positive for intake and negative for issue
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StockAdjustmentRequest {
    #[validate(range(min = -1_000_000_000, max = 1_000_000_000))]
    pub valtozas: i64,
}
