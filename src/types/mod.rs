// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! In-memory model of the resources declared on disk.

pub mod manifest;

pub use manifest::{merge_annotations, Manifest, ManifestSet, NamespaceManifest, ResourceKind};
