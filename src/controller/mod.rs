//! Controller module for SimpleOperator reconciliation
//! This module contains the main controller loop, the per-kind synchronizer,
//! the cleanup workflow, and the builders for the managed resources.

mod cleanup;
pub mod config;
pub mod drift;
mod finalizers;
pub mod kind;
mod reconciler;
mod resources;
#[cfg(test)]
mod resources_test;
pub mod status;
pub mod store;
mod sync;
#[cfg(test)]
mod testing;

pub use config::ReconcilerConfig;
pub use kind::{ManagedKind, ManagedObject};
pub use reconciler::{
    choose_path, merge_requeue, run_controller, watched_kinds, ControllerState, ReconcileOutput,
    ReconcilePath, Reconciler,
};
pub use status::{merge_status, KindOutcome};
pub use store::{ClusterStore, KubeStore, ObjectKey};
