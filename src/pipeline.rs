// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! One provisioning pass over a manifests directory

use crate::directory::{DirectoryReport, GroupProvisioner};
use crate::error::{ProvisionerError, Result};
use crate::inventory::InventoryAnnotator;
use crate::kubernetes::{ClusterReconciler, ReconcileReport};
use crate::manifest::load_directory;
use crate::tiller::Tiller;
use crate::types::NamespaceManifest;
use std::path::Path;
use tracing::{debug, error, info, instrument};

/// What happened to one namespace during a pass
#[derive(Debug)]
pub struct NamespaceSummary {
    pub namespace: String,
    pub cluster: Option<ReconcileReport>,
    pub directory: Option<DirectoryReport>,
    /// The error that stopped this namespace early, if any
    pub error: Option<ProvisionerError>,
}

impl NamespaceSummary {
    fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            cluster: None,
            directory: None,
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
            && self.cluster.as_ref().is_some_and(ReconcileReport::is_complete)
            && self.directory.as_ref().map_or(true, DirectoryReport::is_complete)
    }
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub namespaces: Vec<NamespaceSummary>,
}

impl RunSummary {
    pub fn failed(&self) -> Vec<&NamespaceSummary> {
        self.namespaces.iter().filter(|ns| !ns.is_success()).collect()
    }

    pub fn is_success(&self) -> bool {
        self.namespaces.iter().all(NamespaceSummary::is_success)
    }
}

pub struct Pipeline {
    annotator: InventoryAnnotator,
    tiller: Tiller,
    reconciler: ClusterReconciler,
    groups: Option<GroupProvisioner>,
}

impl Pipeline {
    pub fn new(annotator: InventoryAnnotator, tiller: Tiller, reconciler: ClusterReconciler) -> Self {
        Self {
            annotator,
            tiller,
            reconciler,
            groups: None,
        }
    }

    pub fn with_group_provisioner(mut self, groups: GroupProvisioner) -> Self {
        self.groups = Some(groups);
        self
    }

    /// Provision every namespace declared in `dir`, one after another.
    ///
    /// Only a failed directory scan is an error; per-namespace failures are
    /// reported in the summary.
    #[instrument(skip(self))]
    pub async fn run(&self, dir: &Path) -> Result<RunSummary> {
        let manifests = load_directory(dir)?.into_namespace_manifests();
        info!("Provisioning {} namespaces from {}", manifests.len(), dir.display());

        let mut summary = RunSummary::default();
        for manifest in manifests {
            summary.namespaces.push(self.provision(manifest).await);
        }

        let failed = summary.failed().len();
        if failed == 0 {
            info!("All {} namespaces provisioned", summary.namespaces.len());
        } else {
            error!("{} of {} namespaces failed", failed, summary.namespaces.len());
        }
        Ok(summary)
    }

    pub async fn provision(&self, mut manifest: NamespaceManifest) -> NamespaceSummary {
        let namespace = manifest.name();
        let mut summary = NamespaceSummary::new(&namespace);

        if let Err(e) = self.provision_namespace(&mut manifest, &mut summary).await {
            error!("Namespace {} failed: {}", namespace, e);
            summary.error = Some(e);
        }
        summary
    }

    #[instrument(skip_all, fields(namespace = %summary.namespace))]
    async fn provision_namespace(
        &self,
        manifest: &mut NamespaceManifest,
        summary: &mut NamespaceSummary,
    ) -> Result<()> {
        let namespace = manifest.name();
        self.annotator.validate_namespace(&namespace)?;

        let annotations = self.annotator.prepare_annotations(&namespace).await?;
        manifest.add_annotations(annotations);

        let bundle = self.tiller.build(&namespace, manifest.annotations());
        manifest.extend(bundle);

        summary.cluster = Some(self.reconciler.reconcile(manifest).await?);

        let Some(groups) = &self.groups else {
            return Ok(());
        };
        match groups.provision(&namespace, manifest.annotations()).await {
            Ok(report) => summary.directory = Some(report),
            Err(ProvisionerError::NoMatchingAnnotations(prefix)) => {
                debug!("No {} annotations on {}, skipping directory groups", prefix, namespace);
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
