//! Business logic services

pub mod password;
