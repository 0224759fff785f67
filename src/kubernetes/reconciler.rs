// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Applies a namespace and its dependent resources to the cluster

use super::apply::{apply, Applied, ManagedResource};
use crate::error::{ProvisionerError, Result};
use crate::retry::RetryPolicy;
use crate::types::{NamespaceManifest, ResourceKind};
use futures::future::join4;
use k8s_openapi::api::core::v1::Namespace;
use kube::{Client, ResourceExt};
use tracing::{error, info, instrument};

/// Outcome of one namespace pass; failures never include the Namespace itself
#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub applied: Vec<(ResourceKind, String, Applied)>,
    pub failed: Vec<(ResourceKind, String, ProvisionerError)>,
}

impl ReconcileReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    fn merge(&mut self, other: ReconcileReport) {
        self.applied.extend(other.applied);
        self.failed.extend(other.failed);
    }
}

pub struct ClusterReconciler {
    client: Client,
    policy: RetryPolicy,
}

impl ClusterReconciler {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            policy: RetryPolicy::conflict(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Apply the namespace, then every dependent resource.
    ///
    /// A namespace failure is returned as an error and nothing else is
    /// attempted. Dependent failures are logged and collected in the report.
    #[instrument(skip(self, manifest), fields(namespace = %manifest.name()))]
    pub async fn reconcile(&self, manifest: &NamespaceManifest) -> Result<ReconcileReport> {
        let namespace = manifest.name();
        let namespace_result = self.apply_namespace(&manifest.namespace).await?;

        let mut report = ReconcileReport::default();
        report
            .applied
            .push((ResourceKind::Namespace, namespace.clone(), namespace_result));

        // Kinds are independent of each other, so they are applied side by side
        let (deployments, role_bindings, services, service_accounts) = join4(
            self.apply_all(&namespace, &manifest.deployments),
            self.apply_all(&namespace, &manifest.role_bindings),
            self.apply_all(&namespace, &manifest.services),
            self.apply_all(&namespace, &manifest.service_accounts),
        )
        .await;

        for part in [deployments, role_bindings, services, service_accounts] {
            report.merge(part);
        }

        if report.is_complete() {
            info!("Namespace {} fully reconciled ({} resources)", namespace, report.applied.len());
        } else {
            error!(
                "Namespace {} partially reconciled: {} applied, {} failed",
                namespace,
                report.applied.len(),
                report.failed.len()
            );
        }

        Ok(report)
    }

    pub async fn apply_namespace(&self, namespace: &Namespace) -> Result<Applied> {
        let api = Namespace::api(self.client.clone(), "");
        apply(&api, namespace, &self.policy).await
    }

    async fn apply_all<K: ManagedResource>(&self, namespace: &str, resources: &[K]) -> ReconcileReport {
        let api = K::api(self.client.clone(), namespace);
        let mut report = ReconcileReport::default();

        for resource in resources {
            let name = resource.name_any();
            match apply(&api, resource, &self.policy).await {
                Ok(applied) => report.applied.push((K::KIND, name, applied)),
                Err(e) => {
                    error!("Failed to apply {} {}/{}: {}", K::KIND, namespace, name, e);
                    report.failed.push((K::KIND, name, e));
                }
            }
        }

        report
    }
}
