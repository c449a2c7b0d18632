//! Network fetch collaborator: the cache never talks to the transport
//! directly, it goes through [`NetworkFetch`].

use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeMap;
use std::future::Future;
use url::Url;

use crate::request::Request;
use crate::store::StoredResponse;

/// Classification of a network response for storage eligibility.
///
/// Mirrors the response types a storefront page observes: only `Basic`
/// (same-origin, non-redirected) responses may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
  /// Same-origin, non-redirected response.
  Basic,
  /// Response from another origin; passed through, never stored.
  CrossOrigin,
  /// Redirect response; passed through, never stored.
  Redirect,
}

/// A response received from the network.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
  pub status: u16,
  pub headers: BTreeMap<String, String>,
  pub body: Vec<u8>,
  pub kind: ResponseKind,
}

impl FetchedResponse {
  /// Whether this response may be written to the cache store.
  ///
  /// Only fetch-successful (200) basic-type responses are eligible.
  pub fn is_storable(&self) -> bool {
    self.status == 200 && self.kind == ResponseKind::Basic
  }

  /// Duplicate this response for storage.
  ///
  /// The stored copy is independent of the instance handed back to the
  /// caller, so both remain fully readable.
  pub fn to_stored(&self) -> StoredResponse {
    StoredResponse {
      status: self.status,
      headers: self.headers.clone(),
      body: self.body.clone(),
    }
  }
}

/// Trait for the network side of the cache.
pub trait NetworkFetch: Send + Sync {
  /// Issue the request and return the response, whatever its status.
  ///
  /// Only transport-level failures (unreachable host, connection reset)
  /// are errors; HTTP error statuses come back as responses.
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<FetchedResponse>> + Send;
}

/// Production fetcher backed by reqwest.
///
/// Redirects are not followed: a redirect must be observed as such so it
/// can be passed through to the caller unstored.
#[derive(Clone)]
pub struct HttpFetcher {
  http: reqwest::Client,
  origin: Url,
}

impl HttpFetcher {
  /// Create a fetcher for a site served from the given origin.
  pub fn new(origin: Url) -> Result<Self> {
    let http = reqwest::Client::builder()
      .redirect(reqwest::redirect::Policy::none())
      .build()
      .map_err(|e| eyre!("Failed to build HTTP client: {}", e))?;

    Ok(Self { http, origin })
  }

  fn classify(&self, request: &Request, status: u16) -> ResponseKind {
    if (300..400).contains(&status) {
      ResponseKind::Redirect
    } else if request.is_same_origin(&self.origin) {
      ResponseKind::Basic
    } else {
      ResponseKind::CrossOrigin
    }
  }
}

impl NetworkFetch for HttpFetcher {
  async fn fetch(&self, request: &Request) -> Result<FetchedResponse> {
    let response = self
      .http
      .get(request.url.as_str())
      .send()
      .await
      .map_err(|e| eyre!("Request for {} failed: {}", request.url, e))?;

    let status = response.status().as_u16();
    let headers: BTreeMap<String, String> = response
      .headers()
      .iter()
      .filter_map(|(name, value)| {
        value
          .to_str()
          .ok()
          .map(|v| (name.as_str().to_string(), v.to_string()))
      })
      .collect();

    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read response body for {}: {}", request.url, e))?
      .to_vec();

    let kind = self.classify(request, status);
    tracing::debug!(
      "fetched {} -> {} ({} bytes, {:?})",
      request.url,
      status,
      body.len(),
      kind
    );

    Ok(FetchedResponse {
      status,
      headers,
      body,
      kind,
    })
  }
}
