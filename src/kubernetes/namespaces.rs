// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace lookup and removal

use crate::error::{is_not_found, Result};
use k8s_openapi::api::core::v1::Namespace;
use kube::{
    api::{DeleteParams, ListParams},
    Api, Client, ResourceExt,
};
use tracing::{debug, info, instrument};

/// Names of all namespaces in the cluster
#[instrument(skip(client))]
pub async fn list_namespaces(client: &Client) -> Result<Vec<String>> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let list = namespaces.list(&ListParams::default()).await?;

    debug!("Found {} namespaces", list.items.len());
    Ok(list.items.iter().map(|ns| ns.name_any()).collect())
}

/// Delete a namespace with foreground propagation.
///
/// Returns false when the namespace was already gone.
#[instrument(skip(client))]
pub async fn delete_namespace(client: &Client, namespace: &str) -> Result<bool> {
    let namespaces: Api<Namespace> = Api::all(client.clone());

    match namespaces.delete(namespace, &DeleteParams::foreground()).await {
        Ok(_) => {
            info!("Namespace {} scheduled for deletion", namespace);
            Ok(true)
        }
        Err(e) if is_not_found(&e) => {
            debug!("Namespace {} does not exist", namespace);
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
