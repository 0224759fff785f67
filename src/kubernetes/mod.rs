// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Kubernetes utilities for applying manifests and managing namespaces.

pub mod apply;
pub mod namespaces;
pub mod reconciler;

pub use apply::{apply, Applied, ManagedResource};
pub use namespaces::{delete_namespace, list_namespaces};
pub use reconciler::{ClusterReconciler, ReconcileReport};
