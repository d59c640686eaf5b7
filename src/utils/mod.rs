//! Shared helpers: error mapping, request extraction and field validators

pub mod error;
pub mod extract;
pub mod validation;

pub use error::{AppError, AppResult, ErrorResponse};
pub use extract::{RawQuery, ValidatedJson};
