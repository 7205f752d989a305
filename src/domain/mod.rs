//! Domain layer for tether
//!
//! Documents, structural queries, configuration models and the store port.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{CodecError, CodecResult, StoreError, StoreResult};
