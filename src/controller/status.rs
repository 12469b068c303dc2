//! Status aggregation for SimpleOperator
//!
//! Folds one managed kind's outcome into the owner's status. The other two
//! kinds' state/message pairs are carried over untouched, so concurrent
//! passes for different kinds cannot erase each other's results.

use chrono::{DateTime, Utc};

use super::kind::ManagedKind;
use crate::crd::{ResourceState, SimpleOperatorStatus};

/// Outcome of synchronizing a single managed kind
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KindOutcome {
    pub kind: ManagedKind,
    pub state: ResourceState,
    pub error_message: String,
    /// Observed available replicas, reported only by the workload
    pub available_replicas: Option<i32>,
}

impl KindOutcome {
    pub fn new(kind: ManagedKind, state: ResourceState) -> Self {
        Self {
            kind,
            state,
            error_message: String::new(),
            available_replicas: None,
        }
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    pub fn with_available_replicas(mut self, available: Option<i32>) -> Self {
        self.available_replicas = available;
        self
    }
}

/// The state/message pair owned by `kind`
pub fn kind_state(status: &SimpleOperatorStatus, kind: ManagedKind) -> (Option<ResourceState>, &str) {
    match kind {
        ManagedKind::Workload => (status.deployment_state, &status.deployment_error_msg),
        ManagedKind::NetworkService => (status.service_state, &status.service_error_msg),
        ManagedKind::Route => (status.ingress_state, &status.ingress_error_msg),
    }
}

fn kind_slot(
    status: &mut SimpleOperatorStatus,
    kind: ManagedKind,
) -> (&mut Option<ResourceState>, &mut String) {
    match kind {
        ManagedKind::Workload => (&mut status.deployment_state, &mut status.deployment_error_msg),
        ManagedKind::NetworkService => (&mut status.service_state, &mut status.service_error_msg),
        ManagedKind::Route => (&mut status.ingress_state, &mut status.ingress_error_msg),
    }
}

/// Produce the new status after recording `outcome`
///
/// Overwrites exactly the pair owned by `outcome.kind`, refreshes
/// `lastUpdated`, and replaces `availableReplicas` when the outcome carries it.
pub fn merge_status(
    current: Option<&SimpleOperatorStatus>,
    outcome: &KindOutcome,
    now: DateTime<Utc>,
) -> SimpleOperatorStatus {
    let mut status = current.cloned().unwrap_or_default();

    let (state, message) = kind_slot(&mut status, outcome.kind);
    *state = Some(outcome.state);
    message.clone_from(&outcome.error_message);

    if let Some(available) = outcome.available_replicas {
        status.available_replicas = available;
    }
    status.last_updated = Some(now.to_rfc3339());
    status
}

/// True when `merged` differs from `current` in anything but `lastUpdated`
///
/// A status that was never written always counts as changed.
pub fn needs_write(current: Option<&SimpleOperatorStatus>, merged: &SimpleOperatorStatus) -> bool {
    match current {
        Some(current) if current.last_updated.is_some() => {
            let mut comparable = merged.clone();
            comparable.last_updated.clone_from(&current.last_updated);
            comparable != *current
        }
        _ => true,
    }
}
