//! # Execution Engine
//!
//! Turns expanded task sequences into side effects.
//!
//! ## Layers
//!
//! | Layer | Purpose |
//! |-------|---------|
//! | [`Runner`] | Runs a sequence in order, halting on the first failure |
//! | [`Watcher`] | Re-runs tasks when watched files change |
//! | [`ActionExecutor`] | Seam between the graph and the outside world |
//! | [`Toolchain`] | Production executor backed by [`collaborators`] |
//!
//! [`DryRunExecutor`] records action labels instead of running anything.

pub mod collaborators;
mod executor;
mod runner;
mod toolchain;
mod watcher;

pub use executor::{ActionError, ActionExecutor, DryRunExecutor};
pub use runner::{RunError, RunReport, Runner};
pub use toolchain::Toolchain;
pub use watcher::{
    NotifyWatchService, WatchRuleFailure, WatchSubscription, WatchSummary, Watcher, WatcherState,
};
