//! Infrastructure layer module
//!
//! - Configuration loading (figment)
//! - Logging (tracing, rotating file output, secret scrubbing)
//! - `OpenRouter` API client (reqwest)

pub mod config;
pub mod logging;
pub mod openrouter;
