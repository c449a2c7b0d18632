//! Request identity: the key under which responses are cached.

use color_eyre::{eyre::eyre, Result};
use sha2::{Digest, Sha256};
use url::Url;

/// An intercepted resource request.
///
/// Identity is method + absolute URL; in practice only GET requests flow
/// through the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: String,
  pub url: Url,
}

impl Request {
  /// A GET request for the given absolute URL.
  pub fn get(url: Url) -> Self {
    Self {
      method: "GET".to_string(),
      url,
    }
  }

  /// Build a GET request from a root-relative path (or absolute URL),
  /// resolved against the site origin.
  pub fn resolve(origin: &Url, path_or_url: &str) -> Result<Self> {
    let url = origin
      .join(path_or_url)
      .map_err(|e| eyre!("Invalid request path {}: {}", path_or_url, e))?;
    Ok(Self::get(url))
  }

  /// Stable, fixed-length key for storage lookups.
  pub fn cache_hash(&self) -> String {
    let mut hasher = Sha256::new();
    hasher.update(self.method.as_bytes());
    hasher.update(b":");
    hasher.update(self.url.as_str().as_bytes());
    let result = hasher.finalize();
    hex::encode(result)
  }

  /// Human-readable form for logs and store inspection.
  pub fn description(&self) -> String {
    format!("{} {}", self.method, self.url)
  }

  /// Whether this request targets the given site origin.
  pub fn is_same_origin(&self, origin: &Url) -> bool {
    self.url.origin() == origin.origin()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn origin() -> Url {
    Url::parse("https://shop.example.com").unwrap()
  }

  #[test]
  fn test_resolve_root_relative() {
    let req = Request::resolve(&origin(), "/styles.css").unwrap();
    assert_eq!(req.method, "GET");
    assert_eq!(req.url.as_str(), "https://shop.example.com/styles.css");
  }

  #[test]
  fn test_resolve_absolute_keeps_foreign_origin() {
    let req = Request::resolve(&origin(), "https://cdn.example.net/lib.js").unwrap();
    assert!(!req.is_same_origin(&origin()));
  }

  #[test]
  fn test_cache_hash_is_stable_and_distinct() {
    let a = Request::resolve(&origin(), "/a.css").unwrap();
    let b = Request::resolve(&origin(), "/b.css").unwrap();
    assert_eq!(a.cache_hash(), a.cache_hash());
    assert_ne!(a.cache_hash(), b.cache_hash());
    assert_eq!(a.cache_hash().len(), 64);
  }

  #[test]
  fn test_same_origin_ignores_path() {
    let req = Request::resolve(&origin(), "/deep/path?q=1").unwrap();
    assert!(req.is_same_origin(&origin()));
  }
}
