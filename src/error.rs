// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use thiserror::Error;

use crate::types::ResourceKind;

#[derive(Error, Debug)]
pub enum ProvisionerError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode manifest {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("File {} is not a {expected} manifest", path.display())]
    KindMismatch {
        expected: ResourceKind,
        path: PathBuf,
    },

    #[error("Unsupported resource kind {kind} in {}", path.display())]
    UnsupportedKind { kind: String, path: PathBuf },

    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Failed to apply {kind} {name}: {source}")]
    Apply {
        kind: ResourceKind,
        name: String,
        #[source]
        source: kube::Error,
    },

    #[error("Namespace name {name} must match regex {pattern}")]
    InvalidNamespaceName { name: String, pattern: String },

    #[error("Invalid namespace pattern {pattern}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("No Product found using ProductCode {0}")]
    NoProductFound(String),

    #[error("Inventory record for {product_code} is missing mandatory fields: {}", missing.join(", "))]
    IncompleteInventoryRecord {
        product_code: String,
        missing: Vec<&'static str>,
    },

    #[error("Inventory request failed: {0}")]
    Inventory(String),

    #[error("Inventory transport error: {0}")]
    InventoryTransport(#[from] reqwest::Error),

    #[error("No annotations found with prefix {0}")]
    NoMatchingAnnotations(String),

    #[error("No group members provided for {0}")]
    NoGroupMembers(String),

    #[error("User {member} not found while resolving members of {group}")]
    MemberNotFound { member: String, group: String },

    #[error("No such directory object: {0}")]
    NoSuchObject(String),

    #[error("LDAP error: {0}")]
    LdapError(#[from] ldap3::LdapError),

    #[error("Invalid distinguished name: {0}")]
    InvalidDn(String),
}

impl ProvisionerError {
    /// True when the cluster rejected a write because the object changed underneath us.
    pub fn is_conflict(&self) -> bool {
        match self {
            ProvisionerError::KubeError(e) | ProvisionerError::Apply { source: e, .. } => {
                is_conflict(e)
            }
            _ => false,
        }
    }
}

pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

pub fn is_conflict(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 409)
}

pub type Result<T> = std::result::Result<T, ProvisionerError>;
