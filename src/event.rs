//! Event dispatch for the worker lifecycle.
//!
//! The hosting runtime drives the cache through three event kinds:
//! install, activate, and fetch interception. Events are processed
//! sequentially by a task owning the worker; fetch replies travel back
//! over oneshot channels.

use color_eyre::{eyre::eyre, Result};
use tokio::sync::{mpsc, oneshot};

use crate::fetch::NetworkFetch;
use crate::request::Request;
use crate::store::CacheStore;
use crate::worker::{OfflineCache, Served};

type ReplyTo<T> = oneshot::Sender<Result<T>>;

/// Lifecycle events
#[derive(Debug)]
pub enum Event {
  /// Precache the manifest into the current version's store
  Install(ReplyTo<()>),
  /// Purge stale stores and start intercepting
  Activate(ReplyTo<()>),
  /// An intercepted resource request
  Fetch(Request, ReplyTo<Served>),
}

/// Handle to a running worker task.
///
/// Cloneable; senders from independent interception points all feed the
/// same sequential dispatcher.
#[derive(Clone)]
pub struct WorkerHandle {
  tx: mpsc::UnboundedSender<Event>,
}

impl WorkerHandle {
  /// Spawn the dispatcher task that owns the worker.
  pub fn spawn<S, N>(worker: OfflineCache<S, N>) -> Self
  where
    S: CacheStore + 'static,
    N: NetworkFetch + 'static,
  {
    let (tx, mut rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
      let mut worker = worker;
      while let Some(event) = rx.recv().await {
        match event {
          Event::Install(reply) => {
            let _ = reply.send(worker.install().await);
          }
          Event::Activate(reply) => {
            let _ = reply.send(worker.activate());
          }
          Event::Fetch(request, reply) => {
            let _ = reply.send(worker.handle_request(&request).await);
          }
        }
      }
    });

    Self { tx }
  }

  /// Run the install phase to completion.
  pub async fn install(&self) -> Result<()> {
    let (reply, rx) = oneshot::channel();
    self.send(Event::Install(reply))?;
    rx.await.map_err(|_| eyre!("Worker task stopped"))?
  }

  /// Run the activate phase to completion.
  pub async fn activate(&self) -> Result<()> {
    let (reply, rx) = oneshot::channel();
    self.send(Event::Activate(reply))?;
    rx.await.map_err(|_| eyre!("Worker task stopped"))?
  }

  /// Intercept a request and wait for the served response.
  pub async fn fetch(&self, request: Request) -> Result<Served> {
    let (reply, rx) = oneshot::channel();
    self.send(Event::Fetch(request, reply))?;
    rx.await.map_err(|_| eyre!("Worker task stopped"))?
  }

  fn send(&self, event: Event) -> Result<()> {
    self
      .tx
      .send(event)
      .map_err(|_| eyre!("Worker task stopped"))
  }
}
