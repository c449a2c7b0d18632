//! Durable storage collaborators.
//!
//! All persistent state lives behind two traits:
//! - [`CacheStore`]: versioned request/response stores for the offline cache
//! - [`StateStore`]: JSON values under string keys for cart and preferences
//!
//! [`SqliteStore`] implements both in one database; [`MemoryStore`] is the
//! process-local equivalent, [`NoopStore`] disables caching entirely.

mod memory;
mod sqlite;
mod traits;

pub use memory::{MemoryStore, NoopStore};
pub use sqlite::SqliteStore;
pub use traits::{CacheStore, CachedResponse, StateStore, StoredResponse};
