//! Cluster store seam
//!
//! The reconciler talks to the API server only through `ClusterStore`, so
//! tests can run whole reconciliation passes against an in-memory store or a
//! mock. `KubeStore` is the production implementation over `kube::Api`.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use super::kind::{ManagedKind, ManagedObject};
use crate::crd::SimpleOperator;
use crate::error::{Error, Result};

/// Namespace-qualified object name
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of a persisted object; fails if name or namespace is unset
    pub fn of<K: Resource>(object: &K) -> Result<Self> {
        let namespace = object
            .namespace()
            .ok_or(Error::MissingObjectKey("metadata.namespace"))?;
        let name = object
            .meta()
            .name
            .clone()
            .ok_or(Error::MissingObjectKey("metadata.name"))?;
        Ok(Self { namespace, name })
    }

    /// Same namespace, different name
    pub fn sibling(&self, name: &str) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Trait abstracting the Kubernetes API operations the reconciler needs
///
/// Errors keep the API server response so callers can tell not-found,
/// already-exists and conflicts apart.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Get a SimpleOperator by key
    async fn get_owner(&self, key: &ObjectKey) -> Result<SimpleOperator>;

    /// Replace a SimpleOperator (metadata and spec), honouring its resourceVersion
    async fn update_owner(&self, owner: &SimpleOperator) -> Result<SimpleOperator>;

    /// Replace the status subresource, honouring the resourceVersion
    async fn update_owner_status(&self, owner: &SimpleOperator) -> Result<SimpleOperator>;

    /// Get a managed object of the given kind
    async fn get_managed(&self, kind: ManagedKind, key: &ObjectKey) -> Result<ManagedObject>;

    async fn create_managed(&self, object: &ManagedObject) -> Result<()>;

    async fn update_managed(&self, object: &ManagedObject) -> Result<()>;

    async fn delete_managed(&self, kind: ManagedKind, key: &ObjectKey) -> Result<()>;
}

/// Real Kubernetes client implementation
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn owners(&self, namespace: &str) -> Api<SimpleOperator> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn managed_namespace(object: &ManagedObject) -> Result<String> {
        object
            .metadata()
            .namespace
            .clone()
            .ok_or(Error::MissingObjectKey("metadata.namespace"))
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_owner(&self, key: &ObjectKey) -> Result<SimpleOperator> {
        Ok(self.owners(&key.namespace).get(&key.name).await?)
    }

    async fn update_owner(&self, owner: &SimpleOperator) -> Result<SimpleOperator> {
        let key = ObjectKey::of(owner)?;
        let updated = self
            .owners(&key.namespace)
            .replace(&key.name, &PostParams::default(), owner)
            .await?;
        debug!("Replaced SimpleOperator {}", key);
        Ok(updated)
    }

    async fn update_owner_status(&self, owner: &SimpleOperator) -> Result<SimpleOperator> {
        let key = ObjectKey::of(owner)?;
        let data = serde_json::to_vec(owner)?;
        let updated = self
            .owners(&key.namespace)
            .replace_status(&key.name, &PostParams::default(), data)
            .await?;
        debug!("Replaced status of SimpleOperator {}", key);
        Ok(updated)
    }

    async fn get_managed(&self, kind: ManagedKind, key: &ObjectKey) -> Result<ManagedObject> {
        let client = self.client.clone();
        let object = match kind {
            ManagedKind::Workload => ManagedObject::Workload(
                Api::<Deployment>::namespaced(client, &key.namespace)
                    .get(&key.name)
                    .await?,
            ),
            ManagedKind::NetworkService => ManagedObject::NetworkService(
                Api::<Service>::namespaced(client, &key.namespace)
                    .get(&key.name)
                    .await?,
            ),
            ManagedKind::Route => ManagedObject::Route(
                Api::<Ingress>::namespaced(client, &key.namespace)
                    .get(&key.name)
                    .await?,
            ),
        };
        Ok(object)
    }

    async fn create_managed(&self, object: &ManagedObject) -> Result<()> {
        let namespace = Self::managed_namespace(object)?;
        let client = self.client.clone();
        let pp = PostParams::default();
        match object {
            ManagedObject::Workload(o) => {
                Api::<Deployment>::namespaced(client, &namespace)
                    .create(&pp, o)
                    .await?;
            }
            ManagedObject::NetworkService(o) => {
                Api::<Service>::namespaced(client, &namespace)
                    .create(&pp, o)
                    .await?;
            }
            ManagedObject::Route(o) => {
                Api::<Ingress>::namespaced(client, &namespace)
                    .create(&pp, o)
                    .await?;
            }
        }
        Ok(())
    }

    async fn update_managed(&self, object: &ManagedObject) -> Result<()> {
        let namespace = Self::managed_namespace(object)?;
        let name = object.name().to_string();
        let client = self.client.clone();
        let pp = PostParams::default();
        match object {
            ManagedObject::Workload(o) => {
                Api::<Deployment>::namespaced(client, &namespace)
                    .replace(&name, &pp, o)
                    .await?;
            }
            ManagedObject::NetworkService(o) => {
                Api::<Service>::namespaced(client, &namespace)
                    .replace(&name, &pp, o)
                    .await?;
            }
            ManagedObject::Route(o) => {
                Api::<Ingress>::namespaced(client, &namespace)
                    .replace(&name, &pp, o)
                    .await?;
            }
        }
        Ok(())
    }

    async fn delete_managed(&self, kind: ManagedKind, key: &ObjectKey) -> Result<()> {
        let client = self.client.clone();
        let dp = DeleteParams::default();
        match kind {
            ManagedKind::Workload => {
                Api::<Deployment>::namespaced(client, &key.namespace)
                    .delete(&key.name, &dp)
                    .await?;
            }
            ManagedKind::NetworkService => {
                Api::<Service>::namespaced(client, &key.namespace)
                    .delete(&key.name, &dp)
                    .await?;
            }
            ManagedKind::Route => {
                Api::<Ingress>::namespaced(client, &key.namespace)
                    .delete(&key.name, &dp)
                    .await?;
            }
        }
        Ok(())
    }
}
