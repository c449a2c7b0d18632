//! SQLite implementation of the storage collaborators.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection};
use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::traits::{CacheStore, CachedResponse, StateStore, StoredResponse};
use crate::request::Request;

/// SQLite-backed store: versioned response caches plus app state,
/// all in one database file.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

impl SqliteStore {
  /// Open or create the database at the default location.
  pub fn open() -> Result<Self> {
    let path = Self::default_path()?;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    Self::open_at(&path)
  }

  /// Open or create the database at an explicit path.
  pub fn open_at(path: &Path) -> Result<Self> {
    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;
    Self::from_connection(conn)
  }

  /// Open a transient in-memory database.
  pub fn open_in_memory() -> Result<Self> {
    let conn =
      Connection::open_in_memory().map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::from_connection(conn)
  }

  fn from_connection(conn: Connection) -> Result<Self> {
    let store = Self {
      conn: Mutex::new(conn),
    };
    store.run_migrations()?;
    Ok(store)
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("storefront").join("cache.db"))
  }

  fn run_migrations(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(())
  }
}

/// Schema for the versioned response caches and app state.
const STORE_SCHEMA: &str = r#"
-- One row per named (versioned) cache store
CREATE TABLE IF NOT EXISTS cache_stores (
    name TEXT PRIMARY KEY,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Stored responses, keyed by store name + request identity hash
CREATE TABLE IF NOT EXISTS cache_entries (
    store_name TEXT NOT NULL,
    request_hash TEXT NOT NULL,
    request_descr TEXT NOT NULL,
    status INTEGER NOT NULL,
    headers BLOB NOT NULL,
    body BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (store_name, request_hash)
);

CREATE INDEX IF NOT EXISTS idx_cache_entries_store ON cache_entries(store_name);

-- Durable app state (cart, theme, login flags), JSON values
CREATE TABLE IF NOT EXISTS app_state (
    key TEXT PRIMARY KEY,
    value BLOB NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

impl CacheStore for SqliteStore {
  fn open(&self, name: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR IGNORE INTO cache_stores (name) VALUES (?)",
        params![name],
      )
      .map_err(|e| eyre!("Failed to open store {}: {}", name, e))?;

    Ok(())
  }

  fn get(&self, name: &str, request: &Request) -> Result<Option<CachedResponse>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(
        "SELECT status, headers, body, cached_at FROM cache_entries
         WHERE store_name = ? AND request_hash = ?",
      )
      .map_err(|e| eyre!("Failed to prepare lookup: {}", e))?;

    let row: Option<(u16, Vec<u8>, Vec<u8>, String)> = stmt
      .query_row(params![name, request.cache_hash()], |row| {
        Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
      })
      .ok();

    match row {
      Some((status, headers, body, cached_at_str)) => {
        let headers = serde_json::from_slice(&headers)
          .map_err(|e| eyre!("Failed to deserialize stored headers: {}", e))?;
        let cached_at = parse_datetime(&cached_at_str)?;
        Ok(Some(CachedResponse {
          response: StoredResponse {
            status,
            headers,
            body,
          },
          cached_at,
        }))
      }
      None => Ok(None),
    }
  }

  fn put(&self, name: &str, request: &Request, response: &StoredResponse) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let headers = serde_json::to_vec(&response.headers)
      .map_err(|e| eyre!("Failed to serialize headers: {}", e))?;

    // A put against an unopened store opens it implicitly.
    conn
      .execute(
        "INSERT OR IGNORE INTO cache_stores (name) VALUES (?)",
        params![name],
      )
      .map_err(|e| eyre!("Failed to open store {}: {}", name, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO cache_entries
           (store_name, request_hash, request_descr, status, headers, body, cached_at)
         VALUES (?, ?, ?, ?, ?, ?, datetime('now'))",
        params![
          name,
          request.cache_hash(),
          request.description(),
          response.status,
          headers,
          response.body
        ],
      )
      .map_err(|e| eyre!("Failed to store response for {}: {}", request.description(), e))?;

    Ok(())
  }

  fn delete(&self, name: &str) -> Result<bool> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "DELETE FROM cache_entries WHERE store_name = ?",
        params![name],
      )
      .map_err(|e| eyre!("Failed to delete entries of store {}: {}", name, e))?;

    let removed = conn
      .execute("DELETE FROM cache_stores WHERE name = ?", params![name])
      .map_err(|e| eyre!("Failed to delete store {}: {}", name, e))?;

    Ok(removed > 0)
  }

  fn list_names(&self) -> Result<Vec<String>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT name FROM cache_stores ORDER BY name")
      .map_err(|e| eyre!("Failed to prepare store listing: {}", e))?;

    let names: Vec<String> = stmt
      .query_map([], |row| row.get(0))
      .map_err(|e| eyre!("Failed to list stores: {}", e))?
      .filter_map(|r| r.ok())
      .collect();

    Ok(names)
  }
}

impl StateStore for SqliteStore {
  fn get_value<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare("SELECT value FROM app_state WHERE key = ?")
      .map_err(|e| eyre!("Failed to prepare state lookup: {}", e))?;

    let value: Option<Vec<u8>> = stmt.query_row(params![key], |row| row.get(0)).ok();

    match value {
      Some(bytes) => {
        let value = serde_json::from_slice(&bytes)
          .map_err(|e| eyre!("Failed to deserialize state {}: {}", key, e))?;
        Ok(Some(value))
      }
      None => Ok(None),
    }
  }

  fn set_value<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let bytes =
      serde_json::to_vec(value).map_err(|e| eyre!("Failed to serialize state {}: {}", key, e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO app_state (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, bytes],
      )
      .map_err(|e| eyre!("Failed to store state {}: {}", key, e))?;

    Ok(())
  }

  fn remove_value(&self, key: &str) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM app_state WHERE key = ?", params![key])
      .map_err(|e| eyre!("Failed to remove state {}: {}", key, e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
