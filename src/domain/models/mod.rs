pub mod config;
pub mod document;
pub mod profile;
pub mod query;

pub use config::{ApiConfig, Config, DatabaseConfig, LoggingConfig, RetryConfig};
pub use document::{document_id, lookup, Document, ReplaceResult, ID_FIELD};
pub use profile::Profile;
pub use query::{apply_pipeline, select, Filter, Sort, SortOrder, Stage};
