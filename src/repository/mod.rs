//! Cached repositories over the document store.
//!
//! - [`CachedKeyedRepository`]: one cached value per domain key, populated on open
//! - [`CachedListRepository`]: an explicitly managed list cache
//! - [`ProfileRepository`]: player profiles on top of the keyed repository

pub mod keyed;
pub mod list;
pub mod profile_repository;

pub use keyed::{CachedKeyedRepository, LoadState};
pub use list::{CachedListRepository, ListRecord};
pub use profile_repository::{ProfileRepository, PROFILE_COLLECTION};
