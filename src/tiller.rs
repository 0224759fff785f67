// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Builds the per-namespace Tiller bundle requested through a namespace annotation

use crate::config::TillerConfig;
use crate::constants::{annotations, tiller::*};
use crate::types::Manifest;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, HTTPGetAction, PodSpec, PodTemplateSpec, Probe,
    ResourceRequirements, Service, ServiceAccount, ServicePort, ServiceSpec,
};
use k8s_openapi::api::rbac::v1::{RoleBinding, RoleRef, Subject};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::ObjectMeta;
use std::collections::BTreeMap;
use tracing::debug;

pub struct Tiller {
    config: TillerConfig,
}

impl Tiller {
    pub fn new(config: TillerConfig) -> Self {
        Self { config }
    }

    /// Version requested by the trigger annotation; an empty value selects the default version
    pub fn version(&self, annotations: &BTreeMap<String, String>) -> Option<String> {
        let value = annotations.get(&self.config.annotation)?;
        if value.is_empty() {
            Some(self.config.default_version.clone())
        } else {
            Some(value.clone())
        }
    }

    /// Resources to add to `namespace`. Empty unless the trigger annotation is present.
    pub fn build(&self, namespace: &str, annotations: &BTreeMap<String, String>) -> Vec<Manifest> {
        let Some(version) = self.version(annotations) else {
            debug!("Namespace {} does not request Tiller", namespace);
            return Vec::new();
        };

        debug!("Building Tiller {} bundle for namespace {}", version, namespace);
        vec![
            Manifest::Deployment(self.deployment(namespace, &version)),
            Manifest::Service(service(namespace)),
            Manifest::ServiceAccount(service_account(namespace)),
            Manifest::RoleBinding(role_binding(namespace)),
        ]
    }

    pub fn deployment(&self, namespace: &str, version: &str) -> Deployment {
        let mut pod_labels = labels();
        pod_labels.insert("tier".to_string(), "cs".to_string());

        Deployment {
            metadata: metadata(namespace),
            spec: Some(DeploymentSpec {
                selector: LabelSelector {
                    match_labels: Some(labels()),
                    ..Default::default()
                },
                template: PodTemplateSpec {
                    metadata: Some(ObjectMeta {
                        labels: Some(pod_labels),
                        ..Default::default()
                    }),
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: NAME.to_string(),
                            image: Some(format!("{}:{}", self.config.image, version)),
                            env: Some(vec![EnvVar {
                                name: "TILLER_NAMESPACE".to_string(),
                                value: Some(namespace.to_string()),
                                ..Default::default()
                            }]),
                            ports: Some(vec![ContainerPort {
                                container_port: APP_PORT,
                                ..Default::default()
                            }]),
                            liveness_probe: Some(health_check("/liveness")),
                            readiness_probe: Some(health_check("/readiness")),
                            resources: Some(ResourceRequirements {
                                limits: Some(BTreeMap::from([(
                                    "memory".to_string(),
                                    Quantity("512Mi".to_string()),
                                )])),
                                requests: Some(BTreeMap::from([
                                    ("cpu".to_string(), Quantity("250m".to_string())),
                                    ("memory".to_string(), Quantity("64Mi".to_string())),
                                ])),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }],
                        service_account_name: Some(NAME.to_string()),
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

pub fn service(namespace: &str) -> Service {
    let mut meta = metadata(namespace);
    meta.annotations = Some(BTreeMap::from([
        ("prometheus.io/path".to_string(), "/metrics".to_string()),
        ("prometheus.io/port".to_string(), HEALTH_PORT.to_string()),
        ("prometheus.io/scrape".to_string(), "true".to_string()),
        (annotations::PRODUCT_CODE.to_string(), namespace.to_string()),
        (annotations::INVENTORY_CODE.to_string(), NAME.to_string()),
    ]));

    Service {
        metadata: meta,
        spec: Some(ServiceSpec {
            ports: Some(vec![ServicePort {
                port: APP_PORT,
                ..Default::default()
            }]),
            selector: Some(labels()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

pub fn service_account(namespace: &str) -> ServiceAccount {
    ServiceAccount {
        metadata: metadata(namespace),
        ..Default::default()
    }
}

pub fn role_binding(namespace: &str) -> RoleBinding {
    RoleBinding {
        metadata: metadata(namespace),
        role_ref: RoleRef {
            api_group: "rbac.authorization.k8s.io".to_string(),
            kind: "ClusterRole".to_string(),
            name: CLUSTER_ROLE.to_string(),
        },
        subjects: Some(vec![Subject {
            kind: "ServiceAccount".to_string(),
            name: NAME.to_string(),
            ..Default::default()
        }]),
    }
}

fn labels() -> BTreeMap<String, String> {
    BTreeMap::from([("app".to_string(), "helm".to_string())])
}

fn metadata(namespace: &str) -> ObjectMeta {
    ObjectMeta {
        name: Some(NAME.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(labels()),
        ..Default::default()
    }
}

fn health_check(path: &str) -> Probe {
    Probe {
        http_get: Some(HTTPGetAction {
            path: Some(path.to_string()),
            port: IntOrString::Int(HEALTH_PORT),
            ..Default::default()
        }),
        ..Default::default()
    }
}
