//! Main reconciler for SimpleOperator resources
//!
//! One pass per request: fetch the owner, decide the path from its finalizer
//! and deletion marker, then either record the finalizer, tear everything
//! down, or synchronize the Deployment, Service and Ingress in that order.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::{
    api::Api,
    client::Client,
    runtime::{
        controller::{Action, Controller},
        watcher::Config,
    },
    Resource, ResourceExt,
};
use tracing::{debug, error, info, instrument, warn};

use super::config::ReconcilerConfig;
use super::finalizers;
use super::kind::ManagedKind;
use super::store::{ClusterStore, KubeStore, ObjectKey};
use crate::crd::SimpleOperator;
use crate::error::{Error, Result};

/// Result of one reconciliation pass, as handed back to the scheduler
#[derive(Debug, Default)]
pub struct ReconcileOutput {
    /// Delay before the next pass; `None` waits for a watch event
    pub requeue_after: Option<Duration>,
    pub error: Option<Error>,
}

impl ReconcileOutput {
    pub fn done() -> Self {
        Self::default()
    }

    pub fn requeue(after: Duration) -> Self {
        Self {
            requeue_after: Some(after),
            error: None,
        }
    }

    pub fn failed(requeue_after: Option<Duration>, error: Error) -> Self {
        Self {
            requeue_after,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Map onto the kube runtime contract; errors go through `error_policy`
    pub fn into_action(self) -> Result<Action> {
        match (self.error, self.requeue_after) {
            (Some(e), _) => Err(e),
            (None, Some(after)) => Ok(Action::requeue(after)),
            (None, None) => Ok(Action::await_change()),
        }
    }
}

/// Fold a later requeue request into an earlier one: the first request wins
pub fn merge_requeue(earlier: Option<Duration>, later: Option<Duration>) -> Option<Duration> {
    earlier.or(later)
}

/// Path chosen by the finalizer check
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcilePath {
    /// Finalizer missing: record it and come back before creating anything
    AddFinalizer,
    /// Finalizer present and deletion requested: tear down
    Cleanup,
    /// Finalizer present, object live: converge the managed resources
    Sync,
    /// Deletion requested but our finalizer is gone: nothing left to do
    Skip,
}

/// The FinalizerCheck transition
pub fn choose_path(owner: &SimpleOperator, finalizer: &str) -> ReconcilePath {
    let has_finalizer = finalizers::has_finalizer(&owner.metadata, finalizer);
    let deleting = finalizers::is_being_deleted(&owner.metadata);
    match (has_finalizer, deleting) {
        (false, false) => ReconcilePath::AddFinalizer,
        (false, true) => ReconcilePath::Skip,
        (true, true) => ReconcilePath::Cleanup,
        (true, false) => ReconcilePath::Sync,
    }
}

/// Drives SimpleOperator objects toward their desired state
pub struct Reconciler {
    pub(super) store: Arc<dyn ClusterStore>,
    pub(super) config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(store: Arc<dyn ClusterStore>, config: ReconcilerConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Run one reconciliation pass for the owner at `key`
    #[instrument(skip(self, key), fields(owner = %key))]
    pub async fn reconcile(&self, key: &ObjectKey) -> ReconcileOutput {
        debug!("Reconciling");

        let owner = match self.store.get_owner(key).await {
            Ok(owner) => owner,
            Err(e) if e.is_not_found() => {
                debug!("SimpleOperator {} does not exist", key);
                return ReconcileOutput::done();
            }
            Err(e) => {
                error!("Unable to get SimpleOperator {}: {}", key, e);
                return ReconcileOutput::failed(Some(self.config.backoff), e);
            }
        };

        match choose_path(&owner, &self.config.finalizer) {
            ReconcilePath::AddFinalizer => self.add_owner_finalizer(owner).await,
            ReconcilePath::Cleanup => self.cleanup(key).await,
            ReconcilePath::Sync => self.sync_all(key, &owner).await,
            ReconcilePath::Skip => {
                debug!("SimpleOperator {} is being deleted without our finalizer", key);
                ReconcileOutput::done()
            }
        }
    }

    async fn add_owner_finalizer(&self, mut owner: SimpleOperator) -> ReconcileOutput {
        info!(
            "Newly added SimpleOperator {}, adding finalizer",
            owner.name_any()
        );
        finalizers::add_finalizer(&mut owner.metadata, &self.config.finalizer);

        match self.store.update_owner(&owner).await {
            Ok(_) => ReconcileOutput::requeue(self.config.backoff),
            Err(e) if e.is_conflict() => {
                debug!("Finalizer add hit a stale resourceVersion, retrying later");
                ReconcileOutput::requeue(self.config.backoff)
            }
            Err(e) => {
                error!("Unable to add finalizer to SimpleOperator: {}", e);
                ReconcileOutput::failed(Some(self.config.backoff), e)
            }
        }
    }

    /// Synchronize every managed kind in order
    ///
    /// Each kind converges independently, but a hard error ends the pass
    /// right away. The first requeue requested by any kind is kept.
    async fn sync_all(&self, key: &ObjectKey, owner: &SimpleOperator) -> ReconcileOutput {
        let mut requeue_after = None;

        for kind in ManagedKind::SYNC_ORDER {
            let output = self.sync(kind, key, owner).await;
            requeue_after = merge_requeue(requeue_after, output.requeue_after);
            if let Some(e) = output.error {
                return ReconcileOutput::failed(requeue_after, e);
            }
        }

        ReconcileOutput {
            requeue_after,
            error: None,
        }
    }
}

// ============================================================================
// kube runtime wiring
// ============================================================================

/// Shared state for the controller
pub struct ControllerState {
    pub reconciler: Reconciler,
}

/// Kinds whose changes re-trigger reconciliation of the owning SimpleOperator
pub fn watched_kinds() -> Vec<String> {
    vec![
        SimpleOperator::kind(&()).to_string(),
        Deployment::kind(&()).to_string(),
        Service::kind(&()).to_string(),
        Ingress::kind(&()).to_string(),
    ]
}

/// Main entry point to start the controller
pub async fn run_controller(client: Client, config: ReconcilerConfig) -> Result<()> {
    config.validate()?;
    let owners: Api<SimpleOperator> = Api::all(client.clone());

    info!("Starting SimpleOperator controller, watching {:?}", watched_kinds());

    // Verify CRD exists
    match owners.list(&Default::default()).await {
        Ok(_) => info!("SimpleOperator CRD is available"),
        Err(e) => {
            error!(
                "SimpleOperator CRD not found. Please install the CRD first: {:?}",
                e
            );
            return Err(Error::ConfigError(
                "SimpleOperator CRD not installed".to_string(),
            ));
        }
    }

    let state = Arc::new(ControllerState {
        reconciler: Reconciler::new(Arc::new(KubeStore::new(client.clone())), config),
    });

    Controller::new(owners, Config::default())
        .owns::<Deployment>(Api::all(client.clone()), Config::default())
        .owns::<Service>(Api::all(client.clone()), Config::default())
        .owns::<Ingress>(Api::all(client.clone()), Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, state)
        .for_each(|res| async move {
            match res {
                Ok(obj) => debug!("Reconciled: {:?}", obj),
                Err(e) => warn!("Reconcile error: {:?}", e),
            }
        })
        .await;

    Ok(())
}

/// The kube runtime reconcile callback
///
/// Called whenever a SimpleOperator or one of its owned objects changes, or
/// when a requested requeue fires.
#[instrument(skip(obj, ctx), fields(name = %obj.name_any(), namespace = %obj.namespace().unwrap_or_default()))]
async fn reconcile(obj: Arc<SimpleOperator>, ctx: Arc<ControllerState>) -> Result<Action> {
    let key = ObjectKey::of(obj.as_ref())?;
    ctx.reconciler.reconcile(&key).await.into_action()
}

/// Error policy determines how to handle reconciliation errors
fn error_policy(obj: Arc<SimpleOperator>, error: &Error, ctx: Arc<ControllerState>) -> Action {
    if error.is_retriable() {
        warn!("Reconciliation error for {}: {}", obj.name_any(), error);
    } else {
        error!("Reconciliation error for {}: {}", obj.name_any(), error);
    }
    Action::requeue(ctx.reconciler.config().backoff)
}
