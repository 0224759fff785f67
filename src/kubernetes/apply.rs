// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Create-or-update of a single resource with optimistic-concurrency retry

use crate::error::{is_conflict, is_not_found, ProvisionerError, Result};
use crate::retry::{retry, RetryPolicy};
use crate::types::{merge_annotations, ResourceKind};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::{api::PostParams, Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info, instrument};

/// What a successful apply did to the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Created,
    Updated,
}

/// A resource kind the reconciler can write
pub trait ManagedResource:
    Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    const KIND: ResourceKind;

    /// API handle scoped the way this kind lives in the cluster
    fn api(client: Client, namespace: &str) -> Api<Self>;

    /// Copy server-assigned fields from the live object that a replace must not drop
    fn carry_over(&mut self, _existing: &Self) {}
}

impl ManagedResource for Namespace {
    const KIND: ResourceKind = ResourceKind::Namespace;

    fn api(client: Client, _namespace: &str) -> Api<Self> {
        Api::all(client)
    }
}

impl ManagedResource for Deployment {
    const KIND: ResourceKind = ResourceKind::Deployment;

    fn api(client: Client, namespace: &str) -> Api<Self> {
        Api::namespaced(client, namespace)
    }
}

impl ManagedResource for RoleBinding {
    const KIND: ResourceKind = ResourceKind::RoleBinding;

    fn api(client: Client, namespace: &str) -> Api<Self> {
        Api::namespaced(client, namespace)
    }
}

impl ManagedResource for ServiceAccount {
    const KIND: ResourceKind = ResourceKind::ServiceAccount;

    fn api(client: Client, namespace: &str) -> Api<Self> {
        Api::namespaced(client, namespace)
    }
}

impl ManagedResource for Service {
    const KIND: ResourceKind = ResourceKind::Service;

    fn api(client: Client, namespace: &str) -> Api<Self> {
        Api::namespaced(client, namespace)
    }

    // clusterIP is immutable and assigned by the API server
    fn carry_over(&mut self, existing: &Self) {
        let Some(live) = existing.spec.as_ref() else {
            return;
        };
        let spec = self.spec.get_or_insert_with(Default::default);
        spec.cluster_ip = live.cluster_ip.clone();
        spec.cluster_ips = live.cluster_ips.clone();
    }
}

/// Build the replace payload for `desired` on top of the live object
pub fn prepare_update<K: ManagedResource>(desired: &K, existing: &K) -> K {
    let mut update = desired.clone();
    update.meta_mut().resource_version = existing.meta().resource_version.clone();
    let incoming = update.meta_mut().annotations.take().unwrap_or_default();
    update.meta_mut().annotations = Some(merge_annotations(
        existing.meta().annotations.clone(),
        incoming,
    ));
    update.carry_over(existing);
    update
}

/// Get the object and create or replace it, retrying only on write conflicts
#[instrument(skip(api, desired, policy), fields(kind = %K::KIND, name = %desired.name_any()))]
pub async fn apply<K: ManagedResource>(api: &Api<K>, desired: &K, policy: &RetryPolicy) -> Result<Applied> {
    let name = desired.name_any();
    let name = name.as_str();

    retry(policy, ProvisionerError::is_conflict, || async move {
        match api.get(name).await {
            Ok(existing) => {
                let update = prepare_update(desired, &existing);
                api.replace(name, &PostParams::default(), &update)
                    .await
                    .map_err(|source| apply_error::<K>(name, source))?;
                info!("Updated {} {}", K::KIND, name);
                Ok(Applied::Updated)
            }
            Err(e) if is_not_found(&e) => {
                debug!("{} {} not found, creating", K::KIND, name);
                api.create(&PostParams::default(), desired)
                    .await
                    .map_err(|source| apply_error::<K>(name, source))?;
                info!("Created {} {}", K::KIND, name);
                Ok(Applied::Created)
            }
            Err(source) => Err(apply_error::<K>(name, source)),
        }
    })
    .await
}

fn apply_error<K: ManagedResource>(name: &str, source: kube::Error) -> ProvisionerError {
    if is_conflict(&source) {
        debug!("Conflict writing {} {}", K::KIND, name);
    }
    ProvisionerError::Apply {
        kind: K::KIND,
        name: name.to_string(),
        source,
    }
}
