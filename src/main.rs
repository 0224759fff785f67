// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use anyhow::{bail, Context, Result};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use namespace_provisioner::config::Config;
use namespace_provisioner::directory::{GroupProvisioner, LdapDirectory};
use namespace_provisioner::inventory::{InventoryAnnotator, PimClient};
use namespace_provisioner::kubernetes::ClusterReconciler;
use namespace_provisioner::pipeline::Pipeline;
use namespace_provisioner::tiller::Tiller;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing, RUST_LOG takes precedence over DEBUG
    let default_level = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!(
        "Starting namespace provisioner: manifests_dir={}",
        config.manifests_dir.display()
    );

    // Create Kubernetes client
    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let inventory = Arc::new(PimClient::new(&config.pim)?);
    let annotator = InventoryAnnotator::new(inventory, &config.namespace_pattern)?;
    let mut pipeline = Pipeline::new(
        annotator,
        Tiller::new(config.tiller.clone()),
        ClusterReconciler::new(client),
    );

    let directory = if config.ldap.enabled {
        let directory = Arc::new(
            LdapDirectory::connect(&config.ldap)
                .await
                .context("Failed to bind to LDAP")?,
        );
        pipeline = pipeline
            .with_group_provisioner(GroupProvisioner::new(directory.clone(), config.ldap.clone()));
        Some(directory)
    } else {
        info!("Directory group provisioning disabled");
        None
    };

    let summary = pipeline.run(&config.manifests_dir).await?;

    if let Some(directory) = directory {
        if let Err(e) = directory.close().await {
            warn!("Failed to unbind from LDAP: {}", e);
        }
    }

    let failed = summary.failed();
    for namespace in &failed {
        match &namespace.error {
            Some(e) => error!("Namespace {} failed: {}", namespace.namespace, e),
            None => error!("Namespace {} was only partially provisioned", namespace.namespace),
        }
    }
    if !failed.is_empty() {
        bail!("{} of {} namespaces failed", failed.len(), summary.namespaces.len());
    }

    info!("Provisioned {} namespaces", summary.namespaces.len());
    Ok(())
}
