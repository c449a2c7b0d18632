//! Storage collaborator traits and stored-response types.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::request::Request;

/// A response as kept in a cache store: status, headers, body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredResponse {
  pub status: u16,
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
}

/// A stored response together with its storage timestamp.
#[derive(Debug, Clone)]
pub struct CachedResponse {
  pub response: StoredResponse,
  pub cached_at: DateTime<Utc>,
}

/// Trait for the durable request/response store.
///
/// One named store exists per deployed version; the offline cache opens
/// the current one, writes through to it, and deletes the rest on
/// activation.
pub trait CacheStore: Send + Sync {
  /// Open the named store, creating it if absent.
  fn open(&self, name: &str) -> Result<()>;

  /// Look up a response by request identity in the named store.
  fn get(&self, name: &str, request: &Request) -> Result<Option<CachedResponse>>;

  /// Insert or replace the response for a request identity.
  fn put(&self, name: &str, request: &Request, response: &StoredResponse) -> Result<()>;

  /// Delete the named store and everything in it.
  ///
  /// Returns whether the store existed.
  fn delete(&self, name: &str) -> Result<bool>;

  /// Names of all stores currently present.
  fn list_names(&self) -> Result<Vec<String>>;
}

/// Trait for durable single-value state (cart, theme, login flags).
///
/// Values are JSON-serialized under string keys, the same shape the
/// storefront kept in browser local storage.
pub trait StateStore: Send + Sync {
  /// Read and deserialize the value under a key, if present.
  fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>;

  /// Serialize and write the value under a key.
  fn set_value<T: Serialize>(&self, key: &str, value: &T) -> Result<()>;

  /// Remove the value under a key, if present.
  fn remove_value(&self, key: &str) -> Result<()>;
}
