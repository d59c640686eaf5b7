//! Request-scoped extractors shared by the handlers

pub mod actor;

pub use actor::{Actor, ACTOR_HEADER};
