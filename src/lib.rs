//! # Flightdeck
//!
//! Declarative control loops that keep an airplane's pedals and rudder
//! converged with its controls.
//!
//! This library exposes the CLI definitions and command handlers, and
//! re-exports the workspace crates for convenience.

pub mod cli;
pub mod commands;

pub use flightdeck_reconciler;
pub use flightdeck_store;
