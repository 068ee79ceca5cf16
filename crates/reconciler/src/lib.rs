//! K8s-style control loops for the airplane control chain.
//!
//! Three loops cooperate through the store only:
//!
//! - **Airplane**: creates the airplane's `Pedals` and `Rudder` (owned, so
//!   deleting the airplane deletes them) and records references to both.
//! - **Pedal linkage**: maps the pedal press to a linkage position and sets
//!   the rudder's target from it.
//! - **Rudder**: moves the rudder to its target.
//!
//! # Key Concepts
//!
//! ## Passes
//!
//! A pass reads fresh state, compares it with what it should be, and writes
//! at most the difference. Every write is checked against the version that
//! was read; a lost race ends the pass with a requeue instead of an error.
//!
//! ## Scheduling
//!
//! The [`Manager`] turns store watch events into keys on a per-controller
//! [`WorkQueue`]. Keys are de-duplicated, a key is never processed by two
//! workers at once, and failed passes come back with exponential backoff.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use flightdeck_reconciler::{Manager, ManagerConfig, wait_until_converged};
//! use flightdeck_store::{Airplane, InMemoryStore, Object, StoreExt};
//!
//! #[tokio::main]
//! async fn main() -> flightdeck_reconciler::Result<()> {
//!     let store = InMemoryStore::new_arc();
//!     let handle = Manager::with_default_controllers(store.clone(), ManagerConfig::default())
//!         .start()
//!         .await?;
//!
//!     let plane = store.create_object(Airplane::new("default", "cessna", "N123AB")).await?;
//!     wait_until_converged(store.as_ref(), &plane.key(), std::time::Duration::from_secs(5)).await?;
//!     handle.shutdown().await
//! }
//! ```

pub mod chain;
pub mod config;
pub mod controller;
pub mod controllers;
pub mod converge;
pub mod error;
pub mod linker;
pub mod manager;
pub mod queue;
#[cfg(test)]
mod testing;
pub mod types;

pub use chain::{ChainState, wait_for, wait_until_converged};
pub use config::ManagerConfig;
pub use controller::Reconcile;
pub use controllers::{AirplaneReconciler, PedalLinkageReconciler, RudderReconciler};
pub use error::{Error, Result};
pub use linker::ensure_owned;
pub use manager::{Manager, ManagerHandle, requests_for};
pub use queue::{Backoff, WorkQueue};
pub use types::{ReconcileResult, WriteOutcome};
