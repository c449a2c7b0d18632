//! Offline-first storefront core.
//!
//! The centerpiece is the offline resource cache ([`worker`]): a versioned,
//! durable request/response store with an install/activate/intercept
//! lifecycle. Around it sit the storefront's durable bits of state -
//! shopping cart, theme and login display, plus catalog search and upload
//! validation. Persistence and network access go through the collaborator
//! traits in [`store`] and [`fetch`], so everything is testable without a
//! disk or a network.

pub mod cart;
pub mod catalog;
pub mod config;
pub mod event;
pub mod fetch;
pub mod prefs;
pub mod request;
pub mod store;
pub mod validate;
pub mod worker;

pub use config::DeployConfig;
pub use event::WorkerHandle;
pub use request::Request;
pub use worker::{OfflineCache, Served, ServeSource};
