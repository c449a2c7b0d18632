//! Offline resource cache lifecycle: install, activate, intercept.
//!
//! The worker keeps exactly one versioned store alive and serves
//! intercepted requests cache-first. All persistent state lives in the
//! [`CacheStore`] collaborator; the worker itself only tracks which
//! lifecycle phase it is in.

use color_eyre::{eyre::eyre, Result};
use futures::future::try_join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::DeployConfig;
use crate::fetch::{FetchedResponse, NetworkFetch};
use crate::request::Request;
use crate::store::{CacheStore, CachedResponse};

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServeSource {
  /// Returned from the current version's store, no network access.
  Cache,
  /// Fetched from the network on a cache miss.
  Network,
}

/// A response handed back to the request caller.
#[derive(Debug, Clone)]
pub struct Served {
  pub status: u16,
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
  pub source: ServeSource,
}

impl Served {
  fn from_cache(cached: CachedResponse) -> Self {
    Self {
      status: cached.response.status,
      headers: cached.response.headers,
      body: cached.response.body,
      source: ServeSource::Cache,
    }
  }

  fn from_network(response: FetchedResponse) -> Self {
    Self {
      status: response.status,
      headers: response.headers,
      body: response.body,
      source: ServeSource::Network,
    }
  }
}

/// Lifecycle phase of the worker.
///
/// `install` moves `Idle` to `Installed` on success; `activate` moves
/// `Installed` to `Active` and is idempotent from there. Requests are
/// only intercepted while `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
  Idle,
  Installed,
  Active,
}

/// The offline resource cache.
pub struct OfflineCache<S: CacheStore, N: NetworkFetch> {
  store: Arc<S>,
  network: Arc<N>,
  version: String,
  manifest: Vec<String>,
  origin: url::Url,
  phase: LifecyclePhase,
}

impl<S, N> OfflineCache<S, N>
where
  S: CacheStore + 'static,
  N: NetworkFetch,
{
  /// Create a worker for the given deployment.
  ///
  /// Collaborators are shared so a new version's worker can run against
  /// the same store as the one it supersedes.
  pub fn new(config: &DeployConfig, store: Arc<S>, network: Arc<N>) -> Result<Self> {
    config.validate()?;

    Ok(Self {
      store,
      network,
      version: config.version.clone(),
      manifest: config.precache.clone(),
      origin: config.parse_origin()?,
      phase: LifecyclePhase::Idle,
    })
  }

  pub fn phase(&self) -> LifecyclePhase {
    self.phase
  }

  pub fn version(&self) -> &str {
    &self.version
  }

  /// The underlying store collaborator.
  pub fn store(&self) -> &S {
    &self.store
  }

  /// Install: open the current version's store and precache the manifest.
  ///
  /// All-or-nothing: if any manifest entry fails to fetch with a
  /// storable response, the install fails and no activation may follow.
  /// Entries are fetched concurrently and inserted only once every fetch
  /// has succeeded, so a fetch failure leaves no partial entries; an
  /// insert failure can still leave a partial store, which the next
  /// successful version's activation deletes.
  pub async fn install(&mut self) -> Result<()> {
    self
      .store
      .open(&self.version)
      .map_err(|e| eyre!("Failed to open store {}: {}", self.version, e))?;

    let requests: Vec<Request> = self
      .manifest
      .iter()
      .map(|path| Request::resolve(&self.origin, path))
      .collect::<Result<_>>()?;

    let network = &self.network;
    let fetched = try_join_all(requests.iter().map(|request| async move {
      let response = network.fetch(request).await?;
      if !response.is_storable() {
        return Err(eyre!(
          "Precache fetch for {} not storable (status {})",
          request.description(),
          response.status
        ));
      }
      Ok::<_, color_eyre::Report>((request, response))
    }))
    .await
    .map_err(|e| eyre!("Install of {} failed: {}", self.version, e))?;

    for (request, response) in fetched {
      self
        .store
        .put(&self.version, request, &response.to_stored())
        .map_err(|e| eyre!("Install of {} failed: {}", self.version, e))?;
    }

    self.phase = LifecyclePhase::Installed;
    tracing::info!(
      "installed store {} with {} precached entries",
      self.version,
      self.manifest.len()
    );
    Ok(())
  }

  /// Activate: delete every store whose name differs from the current
  /// version, then start intercepting requests.
  ///
  /// Deletions are independent and best-effort; a failed delete is
  /// logged and skipped, never blocking activation.
  pub fn activate(&mut self) -> Result<()> {
    if self.phase == LifecyclePhase::Idle {
      return Err(eyre!(
        "Cannot activate {}: install has not succeeded",
        self.version
      ));
    }

    let names = match self.store.list_names() {
      Ok(names) => names,
      Err(e) => {
        tracing::warn!("store listing failed during activation: {}", e);
        Vec::new()
      }
    };

    for name in names.iter().filter(|n| *n != &self.version) {
      match self.store.delete(name) {
        Ok(_) => tracing::debug!("deleted stale store {}", name),
        Err(e) => tracing::warn!("failed to delete stale store {}: {}", name, e),
      }
    }

    self.phase = LifecyclePhase::Active;
    tracing::info!("store {} active", self.version);
    Ok(())
  }

  /// Intercept a request: serve from cache when stored, otherwise fetch
  /// from the network and write eligible responses through to the store.
  ///
  /// Store failures on lookup or write degrade the entry to network-only
  /// behavior and never surface to the caller; a network failure with no
  /// cached entry propagates unchanged.
  pub async fn handle_request(&self, request: &Request) -> Result<Served> {
    if self.phase != LifecyclePhase::Active {
      return Err(eyre!(
        "Request intercepted while {} is not active",
        self.version
      ));
    }

    match self.store.get(&self.version, request) {
      Ok(Some(cached)) => {
        tracing::debug!("cache hit for {}", request.description());
        return Ok(Served::from_cache(cached));
      }
      Ok(None) => {}
      Err(e) => {
        tracing::warn!(
          "cache lookup for {} failed, falling back to network: {}",
          request.description(),
          e
        );
      }
    }

    let response = self.network.fetch(request).await?;

    if response.is_storable() {
      // The caller gets the original; the stored duplicate is written
      // without making the caller wait, and write failures are swallowed.
      let store = Arc::clone(&self.store);
      let version = self.version.clone();
      let request = request.clone();
      let stored = response.to_stored();
      tokio::spawn(async move {
        if let Err(e) = store.put(&version, &request, &stored) {
          tracing::debug!("cache write for {} failed: {}", request.description(), e);
        }
      });
    }

    Ok(Served::from_network(response))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::fetch::ResponseKind;
  use crate::store::{MemoryStore, StoredResponse};
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::time::Duration;
  use url::Url;

  const ORIGIN: &str = "https://shop.example.com";

  fn init_tracing() {
    let _ = tracing_subscriber::fmt()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .with_test_writer()
      .try_init();
  }

  /// Scripted network: URL -> response, everything else unreachable.
  struct FakeNetwork {
    responses: HashMap<String, FetchedResponse>,
    calls: AtomicUsize,
  }

  impl FakeNetwork {
    fn new() -> Self {
      Self {
        responses: HashMap::new(),
        calls: AtomicUsize::new(0),
      }
    }

    fn respond(mut self, path: &str, status: u16, kind: ResponseKind, body: &[u8]) -> Self {
      let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
      self.responses.insert(
        url.to_string(),
        FetchedResponse {
          status,
          headers: BTreeMap::new(),
          body: body.to_vec(),
          kind,
        },
      );
      self
    }

    fn calls(&self) -> usize {
      self.calls.load(Ordering::SeqCst)
    }
  }

  impl NetworkFetch for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<FetchedResponse> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self
        .responses
        .get(request.url.as_str())
        .cloned()
        .ok_or_else(|| eyre!("network unreachable: {}", request.url))
    }
  }

  fn config(version: &str, precache: &[&str]) -> DeployConfig {
    DeployConfig {
      version: version.to_string(),
      origin: ORIGIN.to_string(),
      precache: precache.iter().map(|s| s.to_string()).collect(),
    }
  }

  fn request(path: &str) -> Request {
    Request::resolve(&Url::parse(ORIGIN).unwrap(), path).unwrap()
  }

  fn worker(
    version: &str,
    precache: &[&str],
    store: Arc<MemoryStore>,
    network: FakeNetwork,
  ) -> OfflineCache<MemoryStore, FakeNetwork> {
    init_tracing();
    OfflineCache::new(&config(version, precache), store, Arc::new(network)).unwrap()
  }

  #[tokio::test]
  async fn test_install_precaches_every_manifest_entry() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new()
      .respond("/", 200, ResponseKind::Basic, b"<html>")
      .respond("/a.css", 200, ResponseKind::Basic, b"body {}");
    let mut worker = worker("v1", &["/", "/a.css"], Arc::clone(&store), network);

    worker.install().await.unwrap();

    assert_eq!(worker.phase(), LifecyclePhase::Installed);
    assert_eq!(store.entry_count("v1"), Some(2));
    for path in ["/", "/a.css"] {
      assert!(store.get("v1", &request(path)).unwrap().is_some());
    }
    let cached = store.get("v1", &request("/a.css")).unwrap().unwrap();
    assert_eq!(cached.response.body, b"body {}");
  }

  #[tokio::test]
  async fn test_install_fails_when_entry_unreachable() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"<html>");
    let mut worker = worker("v1", &["/", "/missing.css"], Arc::clone(&store), network);

    assert!(worker.install().await.is_err());
    assert_eq!(worker.phase(), LifecyclePhase::Idle);
    // No activation may follow a failed install.
    assert!(worker.activate().is_err());
  }

  #[tokio::test]
  async fn test_install_fails_on_non_200_entry() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new()
      .respond("/", 200, ResponseKind::Basic, b"<html>")
      .respond("/gone.css", 404, ResponseKind::Basic, b"not found");
    let mut worker = worker("v1", &["/", "/gone.css"], Arc::clone(&store), network);

    assert!(worker.install().await.is_err());
    assert_eq!(worker.phase(), LifecyclePhase::Idle);
  }

  #[tokio::test]
  async fn test_cache_hit_short_circuits_network() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new().respond("/a.css", 200, ResponseKind::Basic, b"cached");
    let mut worker = worker("v1", &["/a.css"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();
    let calls_after_install = worker.network.calls();

    let served = worker.handle_request(&request("/a.css")).await.unwrap();

    assert_eq!(served.source, ServeSource::Cache);
    assert_eq!(served.body, b"cached");
    assert_eq!(worker.network.calls(), calls_after_install);
  }

  #[tokio::test]
  async fn test_miss_returns_network_response_and_writes_through() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new()
      .respond("/", 200, ResponseKind::Basic, b"<html>")
      .respond("/img.png", 200, ResponseKind::Basic, b"PNG BYTES");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();

    let served = worker.handle_request(&request("/img.png")).await.unwrap();
    assert_eq!(served.source, ServeSource::Network);
    assert_eq!(served.body, b"PNG BYTES");

    // Wait for the asynchronous write-through to settle.
    tokio::time::sleep(Duration::from_millis(20)).await;

    let cached = store.get("v1", &request("/img.png")).unwrap().unwrap();
    assert_eq!(cached.response.body, served.body);
  }

  #[tokio::test]
  async fn test_non_200_response_is_not_stored() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new()
      .respond("/", 200, ResponseKind::Basic, b"<html>")
      .respond("/broken", 500, ResponseKind::Basic, b"oops");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();

    let served = worker.handle_request(&request("/broken")).await.unwrap();
    assert_eq!(served.status, 500);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.entry_count("v1"), Some(1));
  }

  #[tokio::test]
  async fn test_cross_origin_response_is_passed_through_unstored() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new()
      .respond("/", 200, ResponseKind::Basic, b"<html>")
      .respond("/opaque-cross-origin", 200, ResponseKind::CrossOrigin, b"foreign");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();

    let served = worker
      .handle_request(&request("/opaque-cross-origin"))
      .await
      .unwrap();
    assert_eq!(served.status, 200);
    assert_eq!(served.body, b"foreign");

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.entry_count("v1"), Some(1));
  }

  #[tokio::test]
  async fn test_redirect_response_is_passed_through_unstored() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new()
      .respond("/", 200, ResponseKind::Basic, b"<html>")
      .respond("/moved", 301, ResponseKind::Redirect, b"");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();

    let served = worker.handle_request(&request("/moved")).await.unwrap();
    assert_eq!(served.status, 301);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(store.entry_count("v1"), Some(1));
  }

  #[tokio::test]
  async fn test_network_failure_with_cache_miss_propagates() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"<html>");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();

    assert!(worker.handle_request(&request("/offline.js")).await.is_err());
  }

  #[tokio::test]
  async fn test_activation_deletes_stale_stores() {
    let store = Arc::new(MemoryStore::new());
    store
      .put(
        "v0",
        &request("/old.css"),
        &StoredResponse {
          status: 200,
          headers: BTreeMap::new(),
          body: b"old".to_vec(),
        },
      )
      .unwrap();

    let network = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"<html>");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    assert_eq!(
      store.list_names().unwrap(),
      vec!["v0".to_string(), "v1".to_string()]
    );

    worker.activate().unwrap();
    assert_eq!(worker.phase(), LifecyclePhase::Active);
    assert_eq!(store.list_names().unwrap(), vec!["v1".to_string()]);
  }

  #[tokio::test]
  async fn test_version_bump_deletes_previous_store() {
    let store = Arc::new(MemoryStore::new());

    let network_v1 = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"one");
    let mut v1 = worker("v1", &["/"], Arc::clone(&store), network_v1);
    v1.install().await.unwrap();
    v1.activate().unwrap();

    let network_v2 = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"two");
    let mut v2 = worker("v2", &["/"], Arc::clone(&store), network_v2);
    v2.install().await.unwrap();
    v2.activate().unwrap();

    assert_eq!(store.list_names().unwrap(), vec!["v2".to_string()]);
    let cached = store.get("v2", &request("/")).unwrap().unwrap();
    assert_eq!(cached.response.body, b"two");
  }

  #[tokio::test]
  async fn test_activation_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"<html>");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    worker.install().await.unwrap();
    worker.activate().unwrap();
    let names = store.list_names().unwrap();

    worker.activate().unwrap();
    assert_eq!(store.list_names().unwrap(), names);
    assert_eq!(worker.phase(), LifecyclePhase::Active);
  }

  #[tokio::test]
  async fn test_requests_rejected_before_activation() {
    let store = Arc::new(MemoryStore::new());
    let network = FakeNetwork::new().respond("/", 200, ResponseKind::Basic, b"<html>");
    let mut worker = worker("v1", &["/"], Arc::clone(&store), network);

    assert!(worker.handle_request(&request("/")).await.is_err());

    worker.install().await.unwrap();
    assert!(worker.handle_request(&request("/")).await.is_err());
  }

  /// Store whose lookups always fail; writes are discarded.
  struct BrokenStore;

  impl CacheStore for BrokenStore {
    fn open(&self, _name: &str) -> Result<()> {
      Ok(())
    }
    fn get(&self, _name: &str, _request: &Request) -> Result<Option<CachedResponse>> {
      Err(eyre!("disk gone"))
    }
    fn put(&self, _name: &str, _request: &Request, _response: &StoredResponse) -> Result<()> {
      Err(eyre!("disk gone"))
    }
    fn delete(&self, _name: &str) -> Result<bool> {
      Err(eyre!("disk gone"))
    }
    fn list_names(&self) -> Result<Vec<String>> {
      Err(eyre!("disk gone"))
    }
  }

  #[tokio::test]
  async fn test_store_failure_degrades_to_network_only() {
    let network = FakeNetwork::new().respond("/a.css", 200, ResponseKind::Basic, b"fresh");
    let config = config("v1", &[]);
    let mut worker =
      OfflineCache::new(&config, Arc::new(BrokenStore), Arc::new(network)).unwrap();

    // Empty manifest: install succeeds without touching entries.
    worker.install().await.unwrap();
    worker.activate().unwrap();

    let served = worker.handle_request(&request("/a.css")).await.unwrap();
    assert_eq!(served.source, ServeSource::Network);
    assert_eq!(served.body, b"fresh");
  }
}
