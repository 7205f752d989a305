//! CLI command implementations.

pub mod chat;
pub mod models;
pub mod profile;
