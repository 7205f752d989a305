//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output
//! - Rotating JSON log files
//! - Secret scrubbing for logged payloads

pub mod logger;
pub mod secret_scrubbing;

pub use logger::{LogFormat, LoggerImpl, RotationPolicy};
pub use secret_scrubbing::SecretScrubber;
