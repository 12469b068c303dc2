//! The three managed resource kinds and a tagged wrapper over their objects
//!
//! Every pipeline step (synthesis, drift detection, status mapping, cleanup)
//! dispatches on `ManagedKind` instead of on concrete object types.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde_json::Value;

use super::config::ReconcilerConfig;
use super::resources;
use crate::crd::SimpleOperatorSpec;
use crate::error::Result;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManagedKind {
    Workload,
    NetworkService,
    Route,
}

impl ManagedKind {
    /// Order in which the normal path synchronizes the kinds
    pub const SYNC_ORDER: [ManagedKind; 3] = [
        ManagedKind::Workload,
        ManagedKind::NetworkService,
        ManagedKind::Route,
    ];

    /// Order in which cleanup tears the kinds down, externally reachable edge first
    pub const TEARDOWN_ORDER: [ManagedKind; 3] = [
        ManagedKind::Route,
        ManagedKind::NetworkService,
        ManagedKind::Workload,
    ];

    /// Kubernetes kind of the backing object
    pub fn as_str(&self) -> &'static str {
        match self {
            ManagedKind::Workload => "Deployment",
            ManagedKind::NetworkService => "Service",
            ManagedKind::Route => "Ingress",
        }
    }

    /// Build the fully specified expected object for this kind
    pub fn synthesize(
        &self,
        namespace: &str,
        spec: &SimpleOperatorSpec,
        config: &ReconcilerConfig,
    ) -> ManagedObject {
        match self {
            ManagedKind::Workload => {
                ManagedObject::Workload(resources::build_deployment(namespace, spec, config))
            }
            ManagedKind::NetworkService => {
                ManagedObject::NetworkService(resources::build_service(namespace, config))
            }
            ManagedKind::Route => {
                ManagedObject::Route(resources::build_ingress(namespace, spec, config))
            }
        }
    }
}

impl fmt::Display for ManagedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A managed object of any of the three kinds
#[derive(Clone, Debug, PartialEq)]
pub enum ManagedObject {
    Workload(Deployment),
    NetworkService(Service),
    Route(Ingress),
}

impl ManagedObject {
    pub fn kind(&self) -> ManagedKind {
        match self {
            ManagedObject::Workload(_) => ManagedKind::Workload,
            ManagedObject::NetworkService(_) => ManagedKind::NetworkService,
            ManagedObject::Route(_) => ManagedKind::Route,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ManagedObject::Workload(o) => &o.metadata,
            ManagedObject::NetworkService(o) => &o.metadata,
            ManagedObject::Route(o) => &o.metadata,
        }
    }

    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ManagedObject::Workload(o) => &mut o.metadata,
            ManagedObject::NetworkService(o) => &mut o.metadata,
            ManagedObject::Route(o) => &mut o.metadata,
        }
    }

    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Available replicas reported by a Deployment; `None` for other kinds
    pub fn available_replicas(&self) -> Option<i32> {
        match self {
            ManagedObject::Workload(d) => Some(
                d.status
                    .as_ref()
                    .and_then(|s| s.available_replicas)
                    .unwrap_or(0),
            ),
            _ => None,
        }
    }

    /// JSON form of the object
    pub fn to_value(&self) -> Result<Value> {
        let value = match self {
            ManagedObject::Workload(o) => serde_json::to_value(o)?,
            ManagedObject::NetworkService(o) => serde_json::to_value(o)?,
            ManagedObject::Route(o) => serde_json::to_value(o)?,
        };
        Ok(value)
    }
}
