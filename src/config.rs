//! Deploy-time configuration: the version identifier and precache manifest.
//!
//! The version string is the sole cache-invalidation signal; it must change
//! whenever the manifest or any precached resource's content changes.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct DeployConfig {
  /// Version identifier naming the current cache store.
  pub version: String,
  /// Origin the site is served from; requests to other origins are
  /// never stored.
  pub origin: String,
  /// Root-relative resource paths fetched and stored at install time.
  #[serde(default = "default_precache")]
  pub precache: Vec<String>,
}

fn default_precache() -> Vec<String> {
  [
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/config.js",
    "/manifest.json",
  ]
  .iter()
  .map(|s| s.to_string())
  .collect()
}

impl Default for DeployConfig {
  fn default() -> Self {
    Self {
      version: "v1.0.0".to_string(),
      origin: "http://localhost:8080".to_string(),
      precache: default_precache(),
    }
  }
}

impl DeployConfig {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./storefront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/storefront/config.yaml
  ///
  /// Falls back to the compiled-in deployment when no file is found.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("storefront.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("storefront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: DeployConfig = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    config.validate()?;
    Ok(config)
  }

  /// Check the configuration is usable before any lifecycle runs.
  pub fn validate(&self) -> Result<()> {
    if self.version.trim().is_empty() {
      return Err(eyre!("Version identifier must not be empty"));
    }

    self.parse_origin()?;

    for path in &self.precache {
      if !path.starts_with('/') {
        return Err(eyre!("Precache path must be root-relative: {}", path));
      }
    }

    Ok(())
  }

  /// The site origin as a parsed URL.
  pub fn parse_origin(&self) -> Result<Url> {
    Url::parse(&self.origin).map_err(|e| eyre!("Invalid site origin {}: {}", self.origin, e))
  }
}
