//! SimpleOperator Custom Resource Definition
//!
//! A SimpleOperator describes one web workload: the container image to run,
//! how many replicas to keep available, and the public hostname to expose it
//! on through a TLS-terminated Ingress.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ResourceState;

#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "simpleoperator.szikes.io",
    version = "v1alpha1",
    kind = "SimpleOperator",
    namespaced,
    status = "SimpleOperatorStatus",
    shortname = "so",
    printcolumn = r#"{"name":"Image","type":"string","jsonPath":".spec.image"}"#,
    printcolumn = r#"{"name":"Replicas","type":"integer","jsonPath":".spec.replicas"}"#,
    printcolumn = r#"{"name":"Available","type":"integer","jsonPath":".status.availableReplicas"}"#,
    printcolumn = r#"{"name":"Deployment","type":"string","jsonPath":".status.deploymentState"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SimpleOperatorSpec {
    /// Container image reference, e.g. `nginx:1.25`
    pub image: String,

    /// Desired number of replicas of the workload
    pub replicas: i32,

    /// Public hostname served by the Ingress
    pub host: String,
}

/// Status subresource aggregated from the three managed resources
///
/// Each managed kind owns exactly one state/message pair; writes for one
/// kind never touch the other two.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SimpleOperatorStatus {
    /// RFC 3339 timestamp of the last status write
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,

    /// Available replicas last observed on the Deployment
    #[serde(default)]
    pub available_replicas: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_state: Option<ResourceState>,

    #[serde(default)]
    pub deployment_error_msg: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_state: Option<ResourceState>,

    #[serde(default)]
    pub service_error_msg: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_state: Option<ResourceState>,

    #[serde(default)]
    pub ingress_error_msg: String,
}
