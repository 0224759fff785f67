// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Turns namespace annotations into directory OUs, groups and memberships

use super::{split_dn, Attributes, Directory, SearchRequest};
use crate::config::LdapConfig;
use crate::error::{ProvisionerError, Result};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// A group derived from one `<prefix>/<role>` annotation
#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    pub role: String,
    pub dn: String,
    pub members: Vec<String>,
}

/// Per-role outcome of provisioning one namespace
#[derive(Debug, Default)]
pub struct DirectoryReport {
    /// DNs of groups whose membership was replaced
    pub provisioned: Vec<String>,
    pub failed: Vec<(String, ProvisionerError)>,
}

impl DirectoryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct GroupProvisioner {
    directory: Arc<dyn Directory>,
    config: LdapConfig,
}

impl GroupProvisioner {
    pub fn new(directory: Arc<dyn Directory>, config: LdapConfig) -> Self {
        Self { directory, config }
    }

    /// Groups requested by the namespace annotations, ordered by role
    pub fn groups(&self, namespace: &str, annotations: &BTreeMap<String, String>) -> Vec<GroupSpec> {
        annotations
            .iter()
            .filter_map(|(key, value)| {
                let (prefix, role) = key.split_once('/')?;
                if prefix != self.config.annotation_prefix || role.is_empty() || role.contains('/') {
                    return None;
                }
                Some(GroupSpec {
                    role: role.to_string(),
                    dn: self.group_dn(namespace, role),
                    members: parse_members(value),
                })
            })
            .collect()
    }

    fn group_dn(&self, namespace: &str, role: &str) -> String {
        format!(
            "CN={}-{}-{},OU={},{},{}",
            self.config.application,
            namespace,
            role,
            namespace,
            self.config.common_org_units,
            self.config.base_dn
        )
    }

    /// Ensure every requested group exists with exactly the annotated members.
    ///
    /// A failing role is recorded in the report and does not stop the others.
    #[instrument(skip(self, annotations))]
    pub async fn provision(
        &self,
        namespace: &str,
        annotations: &BTreeMap<String, String>,
    ) -> Result<DirectoryReport> {
        let groups = self.groups(namespace, annotations);
        if groups.is_empty() {
            return Err(ProvisionerError::NoMatchingAnnotations(
                self.config.annotation_prefix.clone(),
            ));
        }

        let mut report = DirectoryReport::default();
        for group in groups {
            match self.provision_group(&group).await {
                Ok(()) => report.provisioned.push(group.dn),
                Err(e) => {
                    error!("Failed to provision {} group for {}: {}", group.role, namespace, e);
                    report.failed.push((group.role, e));
                }
            }
        }

        Ok(report)
    }

    async fn provision_group(&self, group: &GroupSpec) -> Result<()> {
        let (_, ou) = split_dn(&group.dn)?;
        self.ensure_ou(ou).await?;
        self.ensure_group(&group.dn).await?;
        self.replace_members(&group.dn, &group.members).await
    }

    /// Create the OU if absent, creating missing ancestors below the base DN first.
    ///
    /// Returns whether the OU was created.
    pub fn ensure_ou<'a>(&'a self, dn: &'a str) -> BoxFuture<'a, Result<bool>> {
        async move {
            let (name, parent) = split_dn(dn)?;
            let request = SearchRequest::organizational_unit(parent, name);

            let found = match self.directory.search(&request).await {
                Err(ProvisionerError::NoSuchObject(_)) if self.below_base(parent) => {
                    debug!("Parent {} of {} is missing", parent, dn);
                    self.ensure_ou(parent).await?;
                    self.directory.search(&request).await?
                }
                result => result?,
            };

            if !found.is_empty() {
                debug!("OU {} already exists", dn);
                return Ok(false);
            }

            self.directory.add(dn, ou_attributes(name)).await?;
            info!("Created OU {}", dn);
            Ok(true)
        }
        .boxed()
    }

    /// Create the group if absent; returns whether it was created
    pub async fn ensure_group(&self, dn: &str) -> Result<bool> {
        let (name, parent) = split_dn(dn)?;
        let found = self.directory.search(&SearchRequest::group(parent, name)).await?;

        if !found.is_empty() {
            debug!("Group {} already exists", dn);
            return Ok(false);
        }

        self.directory.add(dn, group_attributes(name)).await?;
        info!("Created group {}", dn);
        Ok(true)
    }

    /// Resolve every member and replace the group membership in one write
    pub async fn replace_members(&self, dn: &str, members: &[String]) -> Result<()> {
        if members.is_empty() {
            return Err(ProvisionerError::NoGroupMembers(dn.to_string()));
        }

        let mut accounts = BTreeSet::new();
        for member in members {
            let entries = self
                .directory
                .search(&SearchRequest::user(&self.config.base_dn, member))
                .await?;
            if entries.is_empty() {
                return Err(ProvisionerError::MemberNotFound {
                    member: member.clone(),
                    group: dn.to_string(),
                });
            }
            accounts.extend(entries.into_iter().map(|entry| entry.dn));
        }

        let count = accounts.len();
        self.directory
            .replace(dn, "member", accounts.into_iter().collect())
            .await?;
        info!("Set {} members on {}", count, dn);
        Ok(())
    }

    fn below_base(&self, dn: &str) -> bool {
        let dn = dn.to_ascii_lowercase();
        let suffix = format!(",{}", self.config.base_dn.to_ascii_lowercase());
        dn.len() > suffix.len() && dn.ends_with(&suffix)
    }
}

fn parse_members(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|member| !member.is_empty())
        .map(str::to_string)
        .collect()
}

fn ou_attributes(name: &str) -> Attributes {
    vec![
        (
            "objectClass".to_string(),
            vec!["organizationalUnit".to_string(), "top".to_string()],
        ),
        ("ou".to_string(), vec![name.to_string()]),
        ("name".to_string(), vec![name.to_string()]),
    ]
}

fn group_attributes(name: &str) -> Attributes {
    vec![
        ("objectClass".to_string(), vec!["group".to_string(), "top".to_string()]),
        ("cn".to_string(), vec![name.to_string()]),
        ("name".to_string(), vec![name.to_string()]),
        ("sAMAccountName".to_string(), vec![name.to_string()]),
    ]
}
