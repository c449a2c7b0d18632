//! In-memory storage backends: a real one for tests and a no-op one for
//! running with caching disabled.

use chrono::Utc;
use color_eyre::{eyre::eyre, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;

use super::traits::{CacheStore, CachedResponse, StateStore, StoredResponse};
use crate::request::Request;

/// Process-local store, durable for the lifetime of the process.
#[derive(Default)]
pub struct MemoryStore {
  stores: Mutex<HashMap<String, HashMap<String, CachedResponse>>>,
  state: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Number of entries in the named store, if it exists.
  pub fn entry_count(&self, name: &str) -> Option<usize> {
    let stores = self.stores.lock().ok()?;
    stores.get(name).map(HashMap::len)
  }
}

impl CacheStore for MemoryStore {
  fn open(&self, name: &str) -> Result<()> {
    let mut stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    stores.entry(name.to_string()).or_default();
    Ok(())
  }

  fn get(&self, name: &str, request: &Request) -> Result<Option<CachedResponse>> {
    let stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(
      stores
        .get(name)
        .and_then(|entries| entries.get(&request.cache_hash()))
        .cloned(),
    )
  }

  fn put(&self, name: &str, request: &Request, response: &StoredResponse) -> Result<()> {
    let mut stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    stores.entry(name.to_string()).or_default().insert(
      request.cache_hash(),
      CachedResponse {
        response: response.clone(),
        cached_at: Utc::now(),
      },
    );
    Ok(())
  }

  fn delete(&self, name: &str) -> Result<bool> {
    let mut stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(stores.remove(name).is_some())
  }

  fn list_names(&self) -> Result<Vec<String>> {
    let stores = self
      .stores
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let mut names: Vec<String> = stores.keys().cloned().collect();
    names.sort();
    Ok(names)
  }
}

impl StateStore for MemoryStore {
  fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    match state.get(key) {
      Some(bytes) => {
        let value = serde_json::from_slice(bytes)
          .map_err(|e| eyre!("Failed to deserialize state {}: {}", key, e))?;
        Ok(Some(value))
      }
      None => Ok(None),
    }
  }

  fn set_value<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    let bytes =
      serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize state {}: {}", key, e))?;
    state.insert(key.to_string(), bytes);
    Ok(())
  }

  fn remove_value(&self, key: &str) -> Result<()> {
    let mut state = self
      .state
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    state.remove(key);
    Ok(())
  }
}

/// Store that keeps nothing.
/// Used when caching is disabled - every lookup misses and every write
/// is discarded, which degrades the cache to network-only behavior.
pub struct NoopStore;

impl CacheStore for NoopStore {
  fn open(&self, _name: &str) -> Result<()> {
    Ok(())
  }

  fn get(&self, _name: &str, _request: &Request) -> Result<Option<CachedResponse>> {
    Ok(None) // Always miss
  }

  fn put(&self, _name: &str, _request: &Request, _response: &StoredResponse) -> Result<()> {
    Ok(()) // Discard
  }

  fn delete(&self, _name: &str) -> Result<bool> {
    Ok(false)
  }

  fn list_names(&self) -> Result<Vec<String>> {
    Ok(Vec::new())
  }
}
