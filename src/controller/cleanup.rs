//! Finalizer-driven teardown of managed resources
//!
//! Runs when a SimpleOperator carrying our finalizer is marked for deletion.
//! Managed objects go in reverse dependency order (Ingress, Service,
//! Deployment); each has its finalizer stripped before the delete is issued.
//! The owner's own finalizer is released only once all three are gone.

use tracing::{debug, error, info, instrument};

use super::finalizers;
use super::kind::ManagedKind;
use super::reconciler::{ReconcileOutput, Reconciler};
use super::store::ObjectKey;
use crate::error::Result;

impl Reconciler {
    /// Tear down every managed object, then release the owner
    #[instrument(skip(self, key), fields(owner = %key))]
    pub async fn cleanup(&self, key: &ObjectKey) -> ReconcileOutput {
        info!("SimpleOperator {} is being deleted, cleaning up", key);
        let target = key.sibling(&self.config.object_name);

        for kind in ManagedKind::TEARDOWN_ORDER {
            if let Err(e) = self.teardown(kind, &target).await {
                if e.is_conflict() {
                    debug!("{} {} changed during teardown, retrying later", kind, target);
                    return ReconcileOutput::requeue(self.config.backoff);
                }
                error!("Unable to tear down {} {}: {}", kind, target, e);
                return ReconcileOutput::failed(Some(self.config.backoff), e);
            }
        }

        self.release_owner(key).await
    }

    /// Strip our finalizer from one managed object and delete it
    ///
    /// An object that is already gone at any step counts as torn down.
    async fn teardown(&self, kind: ManagedKind, target: &ObjectKey) -> Result<()> {
        let mut object = match self.store.get_managed(kind, target).await {
            Ok(object) => object,
            Err(e) if e.is_not_found() => {
                debug!("{} {} already absent", kind, target);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if finalizers::remove_finalizer(object.metadata_mut(), &self.config.finalizer) {
            match self.store.update_managed(&object).await {
                Ok(()) => debug!("Removed finalizer from {} {}", kind, target),
                Err(e) if e.is_not_found() => return Ok(()),
                Err(e) => return Err(e),
            }
        }

        match self.store.delete_managed(kind, target).await {
            Ok(()) => {
                info!("Deleted {} {}", kind, target);
                Ok(())
            }
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Drop our finalizer from a fresh copy of the owner
    async fn release_owner(&self, key: &ObjectKey) -> ReconcileOutput {
        let mut owner = match self.store.get_owner(key).await {
            Ok(owner) => owner,
            Err(e) if e.is_not_found() => return ReconcileOutput::done(),
            Err(e) => {
                error!("Unable to get SimpleOperator {} for finalizer removal: {}", key, e);
                return ReconcileOutput::failed(Some(self.config.backoff), e);
            }
        };

        if !finalizers::remove_finalizer(&mut owner.metadata, &self.config.finalizer) {
            return ReconcileOutput::done();
        }

        match self.store.update_owner(&owner).await {
            Ok(_) => {
                info!("Removed finalizer from SimpleOperator {}", key);
                ReconcileOutput::done()
            }
            Err(e) if e.is_not_found() => ReconcileOutput::done(),
            Err(e) if e.is_conflict() => {
                debug!("SimpleOperator {} changed during finalizer removal", key);
                ReconcileOutput::requeue(self.config.backoff)
            }
            Err(e) => {
                error!("Unable to remove finalizer from SimpleOperator {}: {}", key, e);
                ReconcileOutput::failed(Some(self.config.backoff), e)
            }
        }
    }
}
