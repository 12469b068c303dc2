//! Per-kind synchronization of managed resources
//!
//! Fetch the managed object, then create it, update it in place, or leave it
//! alone, and record the outcome on the owner's status. Operation failures
//! end up in the status; only failures to read the owner back or to write
//! its status (other than conflicts) are returned as errors.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, instrument, warn};

use super::drift;
use super::finalizers;
use super::kind::{ManagedKind, ManagedObject};
use super::reconciler::{ReconcileOutput, Reconciler};
use super::resources;
use super::status::{merge_status, needs_write, KindOutcome};
use super::store::ObjectKey;
use crate::crd::{ResourceState, SimpleOperator};
use crate::error::Result;

impl Reconciler {
    /// Synchronize one managed kind for the owner at `key`
    #[instrument(skip(self, kind, key, owner), fields(kind = %kind, owner = %key))]
    pub async fn sync(
        &self,
        kind: ManagedKind,
        key: &ObjectKey,
        owner: &SimpleOperator,
    ) -> ReconcileOutput {
        let target = key.sibling(&self.config.object_name);
        let expected = kind.synthesize(&key.namespace, &owner.spec, &self.config);

        let outcome = match self.store.get_managed(kind, &target).await {
            Ok(current) => self.converge(owner, current, expected).await,
            Err(e) if e.is_not_found() => {
                info!("{} {} not found, creating it", kind, target);
                self.create(owner, expected).await
            }
            Err(e) => {
                error!("Unable to get {} {}: {}", kind, target, e);
                Ok(KindOutcome::new(kind, ResourceState::InternalError).with_error(e.to_string()))
            }
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Unable to synchronize {} {}: {}", kind, target, e);
                return ReconcileOutput::failed(Some(self.config.backoff), e);
            }
        };

        if outcome.state.is_failure() {
            warn!(state = %outcome.state, "{} {} did not converge", kind, target);
        }

        let requeue_after = if outcome.state.needs_requeue() {
            Some(self.config.backoff)
        } else {
            info!("{} {} reconciled", kind, target);
            None
        };

        self.record_status(key, &outcome, requeue_after).await
    }

    /// Update a present object if it drifted, otherwise report convergence
    async fn converge(
        &self,
        owner: &SimpleOperator,
        current: ManagedObject,
        expected: ManagedObject,
    ) -> Result<KindOutcome> {
        let kind = current.kind();
        let available = current.available_replicas();

        if drift::has_drift(&current, &expected)? {
            info!("Updating {} {} to the expected form", kind, current.name());
            let update = self.prepare_update(owner, &current, expected)?;

            let outcome = match self.store.update_managed(&update).await {
                Ok(()) => KindOutcome::new(kind, ResourceState::UpdatingChange),
                Err(e) => {
                    error!("Unable to update {} {}: {}", kind, current.name(), e);
                    KindOutcome::new(kind, ResourceState::FailedToUpdateChange)
                        .with_error(e.to_string())
                }
            };
            return Ok(outcome.with_available_replicas(available));
        }

        let state = match available {
            Some(available) if available != owner.spec.replicas => {
                info!(
                    expected_replicas = owner.spec.replicas,
                    available_replicas = available,
                    "{} is still rolling out",
                    kind
                );
                ResourceState::Reconciling
            }
            _ => ResourceState::Reconciled,
        };
        Ok(KindOutcome::new(kind, state).with_available_replicas(available))
    }

    /// The expected body on top of the live metadata, with linkage re-ensured
    fn prepare_update(
        &self,
        owner: &SimpleOperator,
        current: &ManagedObject,
        expected: ManagedObject,
    ) -> Result<ManagedObject> {
        let expected_meta = expected.metadata().clone();
        let mut update = expected;
        let meta = update.metadata_mut();
        *meta = current.metadata().clone();

        if let Some(labels) = expected_meta.labels {
            meta.labels.get_or_insert_with(Default::default).extend(labels);
        }
        if let Some(annotations) = expected_meta.annotations {
            meta.annotations
                .get_or_insert_with(Default::default)
                .extend(annotations);
        }

        finalizers::add_finalizer(meta, &self.config.finalizer);
        let reference = resources::owner_reference(owner)?;
        let references = meta.owner_references.get_or_insert_with(Vec::new);
        if !references.iter().any(|r| r.uid == reference.uid) {
            references.push(reference);
        }

        drift::set_last_applied(&mut update)?;
        Ok(update)
    }

    /// Create an absent object with finalizer and owner linkage attached
    async fn create(&self, owner: &SimpleOperator, expected: ManagedObject) -> Result<KindOutcome> {
        let kind = expected.kind();
        let mut object = expected;

        let meta = object.metadata_mut();
        finalizers::add_finalizer(meta, &self.config.finalizer);
        meta.owner_references = Some(vec![resources::owner_reference(owner)?]);
        drift::set_last_applied(&mut object)?;

        let outcome = match self.store.create_managed(&object).await {
            Ok(()) => KindOutcome::new(kind, ResourceState::Creating),
            Err(e) if e.is_already_exists() => {
                debug!("{} {} was created concurrently", kind, object.name());
                KindOutcome::new(kind, ResourceState::Reconciled)
            }
            Err(e) => {
                error!("Unable to create {} {}: {}", kind, object.name(), e);
                KindOutcome::new(kind, ResourceState::FailedToCreate).with_error(e.to_string())
            }
        };
        Ok(outcome.with_available_replicas(object.available_replicas()))
    }

    /// Fold the outcome into a freshly read owner and write its status
    ///
    /// The write is skipped when nothing but the timestamp would change. A
    /// version conflict is not retried here; the next pass recomputes it.
    async fn record_status(
        &self,
        key: &ObjectKey,
        outcome: &KindOutcome,
        requeue_after: Option<Duration>,
    ) -> ReconcileOutput {
        let mut owner = match self.store.get_owner(key).await {
            Ok(owner) => owner,
            Err(e) => {
                error!("Unable to get SimpleOperator {} before status update: {}", key, e);
                return ReconcileOutput::failed(requeue_after, e);
            }
        };

        let merged = merge_status(owner.status.as_ref(), outcome, Utc::now());
        if !needs_write(owner.status.as_ref(), &merged) {
            debug!("Status of {} already records {}", key, outcome.state);
            return ReconcileOutput {
                requeue_after,
                error: None,
            };
        }

        owner.status = Some(merged);
        match self.store.update_owner_status(&owner).await {
            Ok(_) => ReconcileOutput {
                requeue_after,
                error: None,
            },
            Err(e) if e.is_conflict() => {
                debug!("Status of {} changed underneath us, retrying later", key);
                ReconcileOutput::requeue(self.config.backoff)
            }
            Err(e) => {
                error!("Unable to update status of SimpleOperator {}: {}", key, e);
                ReconcileOutput::failed(Some(self.config.backoff), e)
            }
        }
    }
}
