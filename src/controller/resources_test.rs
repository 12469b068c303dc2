//! Unit tests for Kubernetes resource builders.
//!
//! Run with: `cargo test -p simple-operator resources_test`

#[cfg(test)]
mod tests {
    use k8s_openapi::api::apps::v1::Deployment;
    use k8s_openapi::api::core::v1::Service;
    use kube::api::ObjectMeta;

    use crate::controller::config::ReconcilerConfig;
    use crate::controller::resources::{
        app_labels, build_deployment, build_ingress, build_service, owner_reference,
    };
    use crate::crd::{SimpleOperator, SimpleOperatorSpec};
    use crate::error::Error;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn spec() -> SimpleOperatorSpec {
        SimpleOperatorSpec {
            image: "nginx:1.25".to_string(),
            replicas: 2,
            host: "example.com".to_string(),
        }
    }

    fn deployment() -> Deployment {
        build_deployment("default", &spec(), &ReconcilerConfig::default())
    }

    fn service() -> Service {
        build_service("default", &ReconcilerConfig::default())
    }

    // -----------------------------------------------------------------------
    // Deployment
    // -----------------------------------------------------------------------

    #[test]
    fn test_deployment_runs_single_container_from_spec() {
        let deployment = deployment();
        let spec = deployment.spec.unwrap();

        assert_eq!(spec.replicas, Some(2));
        let pod = spec.template.spec.unwrap();
        assert_eq!(pod.containers.len(), 1);
        assert_eq!(pod.containers[0].name, "so-object");
        assert_eq!(pod.containers[0].image.as_deref(), Some("nginx:1.25"));
        assert_eq!(
            pod.containers[0].ports.as_ref().unwrap()[0].container_port,
            80
        );
    }

    #[test]
    fn test_deployment_selector_matches_template_labels() {
        let spec = deployment().spec.unwrap();
        let selector = spec.selector.match_labels.unwrap();
        let template_labels = spec.template.metadata.unwrap().labels.unwrap();
        assert_eq!(selector, template_labels);
        assert_eq!(selector.get("app").map(String::as_str), Some("so-object"));
    }

    #[test]
    fn test_replicas_taken_verbatim() {
        let mut spec = spec();
        spec.replicas = 0;
        let deployment = build_deployment("default", &spec, &ReconcilerConfig::default());
        assert_eq!(deployment.spec.unwrap().replicas, Some(0));
    }

    #[test]
    fn test_builders_are_deterministic() {
        assert_eq!(deployment(), deployment());
        assert_eq!(service(), service());
    }

    // -----------------------------------------------------------------------
    // Service
    // -----------------------------------------------------------------------

    #[test]
    fn test_service_selects_workload_pods() {
        let config = ReconcilerConfig::default();
        let spec = service().spec.unwrap();
        assert_eq!(spec.selector, Some(app_labels(&config)));
        let ports = spec.ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].port, 80);
    }

    // -----------------------------------------------------------------------
    // Ingress
    // -----------------------------------------------------------------------

    #[test]
    fn test_ingress_terminates_tls_for_host() {
        let ingress = build_ingress("default", &spec(), &ReconcilerConfig::default());
        let spec = ingress.spec.unwrap();

        let tls = spec.tls.unwrap();
        assert_eq!(tls.len(), 1);
        assert_eq!(tls[0].hosts, Some(vec!["example.com".to_string()]));
        assert_eq!(tls[0].secret_name.as_deref(), Some("tls-cert"));

        let rules = spec.rules.unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].host.as_deref(), Some("example.com"));

        let paths = &rules[0].http.as_ref().unwrap().paths;
        assert_eq!(paths[0].path.as_deref(), Some("/"));
        assert_eq!(paths[0].path_type, "Prefix");
        let backend = paths[0].backend.service.as_ref().unwrap();
        assert_eq!(backend.name, "so-object");
        assert_eq!(backend.port.as_ref().unwrap().number, Some(80));
    }

    #[test]
    fn test_ingress_carries_issuer_annotations() {
        let config = ReconcilerConfig {
            cluster_issuer: "letsencrypt-prod".to_string(),
            ..Default::default()
        };
        let ingress = build_ingress("default", &spec(), &config);
        let annotations = ingress.metadata.annotations.unwrap();
        assert_eq!(
            annotations
                .get("cert-manager.io/cluster-issuer")
                .map(String::as_str),
            Some("letsencrypt-prod")
        );
        assert_eq!(
            annotations
                .get("kubernetes.io/ingress.class")
                .map(String::as_str),
            Some("nginx")
        );
        assert_eq!(annotations.len(), 2);
        assert!(!annotations.contains_key("nginx.ingress.kubernetes.io/rewrite-target"));
    }

    #[test]
    fn test_custom_name_and_port_flow_through() {
        let config = ReconcilerConfig {
            object_name: "web".to_string(),
            port: 8080,
            ..Default::default()
        };
        let ingress = build_ingress("apps", &spec(), &config);
        assert_eq!(ingress.metadata.name.as_deref(), Some("web"));
        assert_eq!(ingress.metadata.namespace.as_deref(), Some("apps"));
        let backend = ingress.spec.unwrap().rules.unwrap()[0]
            .http
            .as_ref()
            .unwrap()
            .paths[0]
            .backend
            .service
            .clone()
            .unwrap();
        assert_eq!(backend.name, "web");
        assert_eq!(backend.port.unwrap().number, Some(8080));
    }

    // -----------------------------------------------------------------------
    // Owner reference
    // -----------------------------------------------------------------------

    #[test]
    fn test_owner_reference_points_at_owner() {
        let mut owner = SimpleOperator::new("so-object", spec());
        owner.metadata = ObjectMeta {
            name: Some("so-object".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("uid-1".to_string()),
            ..Default::default()
        };

        let reference = owner_reference(&owner).unwrap();
        assert_eq!(reference.kind, "SimpleOperator");
        assert_eq!(reference.api_version, "simpleoperator.szikes.io/v1alpha1");
        assert_eq!(reference.uid, "uid-1");
        assert_eq!(reference.controller, Some(true));
    }

    #[test]
    fn test_owner_reference_requires_uid() {
        let owner = SimpleOperator::new("so-object", spec());
        assert!(matches!(
            owner_reference(&owner),
            Err(Error::MissingObjectKey("metadata.uid"))
        ));
    }
}
