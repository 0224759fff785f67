// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Loading resource manifests from disk

use crate::error::{ProvisionerError, Result};
use crate::types::{Manifest, ManifestSet, ResourceKind};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::TypeMeta;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

const MANIFEST_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Decode a single manifest file.
///
/// With `desired` set, a file of any other kind fails with
/// [`ProvisionerError::KindMismatch`] so callers can tell "not the file I
/// want" apart from a corrupt one.
pub fn load_manifest(path: &Path, desired: Option<ResourceKind>) -> Result<Manifest> {
    let contents = fs::read_to_string(path).map_err(|source| ProvisionerError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let type_meta: TypeMeta = decode(path, &contents)?;
    let kind = ResourceKind::from_kind(&type_meta.kind);

    if let Some(expected) = desired {
        if kind != Some(expected) {
            return Err(ProvisionerError::KindMismatch {
                expected,
                path: path.to_path_buf(),
            });
        }
    }

    let Some(kind) = kind else {
        return Err(ProvisionerError::UnsupportedKind {
            kind: type_meta.kind,
            path: path.to_path_buf(),
        });
    };

    let manifest = match kind {
        ResourceKind::Namespace => Manifest::Namespace(decode(path, &contents)?),
        ResourceKind::Deployment => Manifest::Deployment(decode(path, &contents)?),
        ResourceKind::RoleBinding => Manifest::RoleBinding(decode(path, &contents)?),
        ResourceKind::ServiceAccount => Manifest::ServiceAccount(decode(path, &contents)?),
        ResourceKind::Service => Manifest::Service(decode(path, &contents)?),
    };

    debug!("Loaded {} {} from {}", kind, manifest.name(), path.display());
    Ok(manifest)
}

/// Load a file that must contain a Namespace
pub fn load_namespace(path: &Path) -> Result<Namespace> {
    match load_manifest(path, Some(ResourceKind::Namespace))? {
        Manifest::Namespace(ns) => Ok(ns),
        _ => Err(ProvisionerError::KindMismatch {
            expected: ResourceKind::Namespace,
            path: path.to_path_buf(),
        }),
    }
}

/// Scan a directory and classify every manifest in it.
///
/// Files with other extensions and sub-directories are skipped. A manifest
/// of an unsupported kind aborts the whole scan.
#[instrument]
pub fn load_directory(dir: &Path) -> Result<ManifestSet> {
    let io_err = |source: std::io::Error| ProvisionerError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_err)?;
    paths.sort();

    let mut set = ManifestSet::default();
    for path in paths {
        if path.is_dir() {
            debug!("Skipping directory {}", path.display());
            continue;
        }
        if !has_manifest_extension(&path) {
            info!("Skipping {}, not a manifest file", path.display());
            continue;
        }
        set.insert(load_manifest(&path, None)?);
    }

    info!("Loaded {} manifests from {}", set.len(), dir.display());
    Ok(set)
}

fn has_manifest_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| MANIFEST_EXTENSIONS.contains(&ext))
}

fn decode<T: DeserializeOwned>(path: &Path, contents: &str) -> Result<T> {
    serde_yaml::from_str(contents).map_err(|source| ProvisionerError::Decode {
        path: path.to_path_buf(),
        source,
    })
}
