//! Data models

mod audit;
pub mod log_filter;
mod product;
mod user;

pub use audit::*;
pub use log_filter::{FieldError, FieldErrorKind, FilterError, LogFilter, RawQueryParams, RawValue};
pub use product::*;
pub use user::*;
