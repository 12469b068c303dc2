//! Shared types for the SimpleOperator CRD

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Reconciliation state recorded for one managed resource kind
///
/// Written into the owner's status by the status aggregator; never persisted
/// on its own.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq, Eq)]
pub enum ResourceState {
    /// The resource matches the expected form
    #[default]
    Reconciled,
    /// The workload matches but has not reached the desired available replicas
    Reconciling,
    /// The resource was absent and a create was issued
    Creating,
    /// Drift was detected and an update was issued
    UpdatingChange,
    FailedToCreate,
    FailedToUpdateChange,
    /// The resource could not be read
    InternalError,
}

impl ResourceState {
    /// Whether this state asks for another pass after the short backoff
    pub fn needs_requeue(&self) -> bool {
        !matches!(self, ResourceState::Reconciled)
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ResourceState::FailedToCreate
                | ResourceState::FailedToUpdateChange
                | ResourceState::InternalError
        )
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResourceState::Reconciled => "Reconciled",
            ResourceState::Reconciling => "Reconciling",
            ResourceState::Creating => "Creating",
            ResourceState::UpdatingChange => "UpdatingChange",
            ResourceState::FailedToCreate => "FailedToCreate",
            ResourceState::FailedToUpdateChange => "FailedToUpdateChange",
            ResourceState::InternalError => "InternalError",
        };
        write!(f, "{s}")
    }
}
