//! In-memory `ClusterStore` for reconciler tests
//!
//! Mimics the API server behaviour the reconciler depends on: resourceVersion
//! checks on replace, AlreadyExists on duplicate create, finalizers blocking
//! deletion, and owners disappearing once their last finalizer is removed
//! after a deletion request. Every call is recorded in order.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::apps::v1::DeploymentStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};

use super::kind::{ManagedKind, ManagedObject};
use super::store::{ClusterStore, ObjectKey};
use crate::crd::{SimpleOperator, SimpleOperatorSpec};
use crate::error::{api_error, Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Call {
    GetOwner,
    UpdateOwner,
    UpdateOwnerStatus,
    GetManaged(ManagedKind),
    CreateManaged(ManagedKind),
    UpdateManaged(ManagedKind),
    DeleteManaged(ManagedKind),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::GetOwner | Call::GetManaged(_))
    }
}

#[derive(Default)]
struct Inner {
    owners: HashMap<ObjectKey, SimpleOperator>,
    managed: HashMap<(ManagedKind, ObjectKey), ManagedObject>,
    calls: Vec<Call>,
    failures: HashMap<Call, (u16, String)>,
    version: u64,
}

impl Inner {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn record(&mut self, call: Call) -> Result<()> {
        self.calls.push(call);
        match self.failures.get(&call) {
            Some((code, reason)) => Err(api_error(*code, reason, "injected failure")),
            None => Ok(()),
        }
    }
}

fn not_found(what: &str) -> Error {
    api_error(404, "NotFound", &format!("{what} not found"))
}

fn conflict() -> Error {
    api_error(
        409,
        "Conflict",
        "the object has been modified; please apply your changes to the latest version",
    )
}

fn check_version(stored: &ObjectMeta, incoming: &ObjectMeta) -> Result<()> {
    match &incoming.resource_version {
        Some(v) if Some(v) != stored.resource_version.as_ref() => Err(conflict()),
        _ => Ok(()),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an owner as if a user had just applied it
    pub fn insert_owner(&self, owner: SimpleOperator) {
        let mut inner = self.inner.lock().unwrap();
        let key = ObjectKey::of(&owner).unwrap();
        let mut owner = owner;
        owner.metadata.resource_version = Some(inner.next_version());
        owner
            .metadata
            .uid
            .get_or_insert_with(|| format!("uid-{}", key.name));
        inner.owners.insert(key, owner);
    }

    /// Seed a managed object directly, bypassing call recording
    pub fn insert_managed(&self, object: ManagedObject) {
        let mut inner = self.inner.lock().unwrap();
        let key = ObjectKey::new(
            object.metadata().namespace.clone().unwrap(),
            object.name().to_string(),
        );
        let mut object = object;
        object.metadata_mut().resource_version = Some(inner.next_version());
        inner.managed.insert((object.kind(), key), object);
    }

    pub fn owner(&self, key: &ObjectKey) -> Option<SimpleOperator> {
        self.inner.lock().unwrap().owners.get(key).cloned()
    }

    pub fn managed(&self, kind: ManagedKind, key: &ObjectKey) -> Option<ManagedObject> {
        self.inner
            .lock()
            .unwrap()
            .managed
            .get(&(kind, key.clone()))
            .cloned()
    }

    /// Simulate the user deleting the owner
    pub fn mark_owner_deleted(&self, key: &ObjectKey) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(owner) = inner.owners.get_mut(key) {
            owner.metadata.deletion_timestamp = Some(Time(Utc::now()));
        }
    }

    /// Simulate the Deployment controller reporting available pods
    pub fn set_available_replicas(&self, key: &ObjectKey, available: i32) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(ManagedObject::Workload(d)) =
            inner.managed.get_mut(&(ManagedKind::Workload, key.clone()))
        {
            d.status = Some(DeploymentStatus {
                available_replicas: Some(available),
                ..Default::default()
            });
        }
    }

    /// Make every subsequent `call` fail with the given API status
    pub fn fail(&self, call: Call, code: u16, reason: &str) {
        self.inner
            .lock()
            .unwrap()
            .failures
            .insert(call, (code, reason.to_string()));
    }

    pub fn clear_failures(&self) {
        self.inner.lock().unwrap().failures.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get_owner(&self, key: &ObjectKey) -> Result<SimpleOperator> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(Call::GetOwner)?;
        inner
            .owners
            .get(key)
            .cloned()
            .ok_or_else(|| not_found("simpleoperators"))
    }

    async fn update_owner(&self, owner: &SimpleOperator) -> Result<SimpleOperator> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(Call::UpdateOwner)?;
        let key = ObjectKey::of(owner)?;
        let stored = inner
            .owners
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found("simpleoperators"))?;
        check_version(&stored.metadata, &owner.metadata)?;

        let mut updated = owner.clone();
        updated.status = stored.status.clone();
        updated.metadata.deletion_timestamp = stored.metadata.deletion_timestamp.clone();
        updated.metadata.resource_version = Some(inner.next_version());

        let finalized = updated.metadata.deletion_timestamp.is_some()
            && updated
                .metadata
                .finalizers
                .as_ref()
                .map_or(true, Vec::is_empty);
        if finalized {
            inner.owners.remove(&key);
        } else {
            inner.owners.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn update_owner_status(&self, owner: &SimpleOperator) -> Result<SimpleOperator> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(Call::UpdateOwnerStatus)?;
        let key = ObjectKey::of(owner)?;
        let mut stored = inner
            .owners
            .get(&key)
            .cloned()
            .ok_or_else(|| not_found("simpleoperators"))?;
        check_version(&stored.metadata, &owner.metadata)?;

        stored.status = owner.status.clone();
        stored.metadata.resource_version = Some(inner.next_version());
        inner.owners.insert(key, stored.clone());
        Ok(stored)
    }

    async fn get_managed(&self, kind: ManagedKind, key: &ObjectKey) -> Result<ManagedObject> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(Call::GetManaged(kind))?;
        inner
            .managed
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| not_found(kind.as_str()))
    }

    async fn create_managed(&self, object: &ManagedObject) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let kind = object.kind();
        inner.record(Call::CreateManaged(kind))?;
        let key = ObjectKey::new(
            object.metadata().namespace.clone().unwrap_or_default(),
            object.name().to_string(),
        );
        if inner.managed.contains_key(&(kind, key.clone())) {
            return Err(api_error(409, "AlreadyExists", "already exists"));
        }
        let mut created = object.clone();
        created.metadata_mut().resource_version = Some(inner.next_version());
        inner.managed.insert((kind, key), created);
        Ok(())
    }

    async fn update_managed(&self, object: &ManagedObject) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let kind = object.kind();
        inner.record(Call::UpdateManaged(kind))?;
        let key = ObjectKey::new(
            object.metadata().namespace.clone().unwrap_or_default(),
            object.name().to_string(),
        );
        let stored = inner
            .managed
            .get(&(kind, key.clone()))
            .cloned()
            .ok_or_else(|| not_found(kind.as_str()))?;
        check_version(stored.metadata(), object.metadata())?;

        let mut updated = object.clone();
        updated.metadata_mut().resource_version = Some(inner.next_version());
        inner.managed.insert((kind, key), updated);
        Ok(())
    }

    async fn delete_managed(&self, kind: ManagedKind, key: &ObjectKey) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(Call::DeleteManaged(kind))?;
        let entry = (kind, key.clone());
        let blocked = match inner.managed.get_mut(&entry) {
            None => return Err(not_found(kind.as_str())),
            Some(object) => {
                let meta = object.metadata_mut();
                let blocked = meta.finalizers.as_ref().is_some_and(|f| !f.is_empty());
                if blocked {
                    meta.deletion_timestamp = Some(Time(Utc::now()));
                }
                blocked
            }
        };
        if !blocked {
            inner.managed.remove(&entry);
        }
        Ok(())
    }
}

/// A persisted-looking owner in namespace `default`
pub fn sample_owner(name: &str) -> SimpleOperator {
    let mut owner = SimpleOperator::new(
        name,
        SimpleOperatorSpec {
            image: "nginx:1.25".to_string(),
            replicas: 2,
            host: "example.com".to_string(),
        },
    );
    owner.metadata.namespace = Some("default".to_string());
    owner.metadata.uid = Some(format!("uid-{name}"));
    owner
}
