//! Kubernetes resource builders for SimpleOperator
//!
//! Pure functions mapping a SimpleOperator spec to the expected Deployment,
//! Service and Ingress. Owner linkage and the cleanup finalizer are attached
//! separately when an object is first created.

use std::collections::BTreeMap;

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, PodSpec, PodTemplateSpec, Service, ServicePort, ServiceSpec,
};
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};

use super::config::ReconcilerConfig;
use crate::crd::{SimpleOperator, SimpleOperatorSpec};
use crate::error::{Error, Result};

/// Selector label binding the Service to the Deployment's pods
pub fn app_labels(config: &ReconcilerConfig) -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), config.object_name.clone())])
}

/// Create a controller OwnerReference for cascade deletion
///
/// Fails when the owner has not been persisted yet (no uid).
pub fn owner_reference(owner: &SimpleOperator) -> Result<OwnerReference> {
    let uid = owner
        .metadata
        .uid
        .clone()
        .ok_or(Error::MissingObjectKey("metadata.uid"))?;
    Ok(OwnerReference {
        api_version: SimpleOperator::api_version(&()).to_string(),
        kind: SimpleOperator::kind(&()).to_string(),
        name: owner.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

fn object_meta(namespace: &str, config: &ReconcilerConfig) -> ObjectMeta {
    ObjectMeta {
        name: Some(config.object_name.clone()),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    }
}

// ============================================================================
// Deployment
// ============================================================================

pub fn build_deployment(
    namespace: &str,
    spec: &SimpleOperatorSpec,
    config: &ReconcilerConfig,
) -> Deployment {
    let labels = app_labels(config);

    Deployment {
        metadata: object_meta(namespace, config),
        spec: Some(DeploymentSpec {
            replicas: Some(spec.replicas),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: config.object_name.clone(),
                        image: Some(spec.image.clone()),
                        ports: Some(vec![ContainerPort {
                            container_port: config.port,
                            ..Default::default()
                        }]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        status: None,
    }
}

// ============================================================================
// Service
// ============================================================================

pub fn build_service(namespace: &str, config: &ReconcilerConfig) -> Service {
    Service {
        metadata: object_meta(namespace, config),
        spec: Some(ServiceSpec {
            selector: Some(app_labels(config)),
            ports: Some(vec![ServicePort {
                port: config.port,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        status: None,
    }
}

// ============================================================================
// Ingress
// ============================================================================

/// Annotations asking cert-manager for a certificate and selecting the controller
pub fn route_annotations(config: &ReconcilerConfig) -> BTreeMap<String, String> {
    // No nginx rewrite-target: the single "/" prefix path needs no rewriting
    BTreeMap::from([
        (
            "cert-manager.io/cluster-issuer".to_string(),
            config.cluster_issuer.clone(),
        ),
        (
            "kubernetes.io/ingress.class".to_string(),
            config.ingress_class.clone(),
        ),
    ])
}

pub fn build_ingress(
    namespace: &str,
    spec: &SimpleOperatorSpec,
    config: &ReconcilerConfig,
) -> Ingress {
    let mut metadata = object_meta(namespace, config);
    metadata.annotations = Some(route_annotations(config));

    Ingress {
        metadata,
        spec: Some(IngressSpec {
            tls: Some(vec![IngressTLS {
                hosts: Some(vec![spec.host.clone()]),
                secret_name: Some(config.tls_secret_name.clone()),
            }]),
            rules: Some(vec![IngressRule {
                host: Some(spec.host.clone()),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some("/".to_string()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: config.object_name.clone(),
                                port: Some(ServiceBackendPort {
                                    number: Some(config.port),
                                    name: None,
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            ..Default::default()
        }),
        status: None,
    }
}
