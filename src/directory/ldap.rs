// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! [`Directory`] over an LDAP connection

use super::{Attributes, Directory, DirectoryEntry, SearchRequest};
use crate::config::LdapConfig;
use crate::constants::directory::NO_SUCH_OBJECT;
use crate::error::{ProvisionerError, Result};
use async_trait::async_trait;
use ldap3::{LdapConnAsync, LdapConnSettings, LdapError, LdapResult, Mod, Scope, SearchEntry, SearchOptions};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const SUCCESS: u32 = 0;
const SIZE_LIMIT_EXCEEDED: u32 = 4;

/// A bound LDAP session; cloned handles share the one connection
#[derive(Clone)]
pub struct LdapDirectory {
    ldap: ldap3::Ldap,
}

impl LdapDirectory {
    /// Connect to the configured host and bind with the service account
    #[instrument(skip(config), fields(hostname = %config.hostname))]
    pub async fn connect(config: &LdapConfig) -> Result<Self> {
        let url = ldap_url(&config.hostname);
        let settings = LdapConnSettings::new().set_conn_timeout(Duration::from_secs(10));
        let (conn, mut ldap) = LdapConnAsync::with_settings(settings, &url).await?;
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                warn!("LDAP connection closed: {}", e);
            }
        });

        ldap.simple_bind(&config.username, &config.password)
            .await?
            .success()?;
        info!("Bound to {} as {}", url, config.username);

        Ok(Self { ldap })
    }

    pub async fn close(&self) -> Result<()> {
        let mut ldap = self.ldap.clone();
        ldap.unbind().await?;
        Ok(())
    }
}

#[async_trait]
impl Directory for LdapDirectory {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>> {
        let filter = request.filter.to_string();
        debug!("Searching {} under {}", filter, request.base);

        let mut ldap = self.ldap.clone();
        let ldap3::SearchResult(entries, result) = ldap
            .with_search_options(SearchOptions::new().sizelimit(request.size_limit))
            .search(&request.base, Scope::Subtree, &filter, request.attributes.clone())
            .await?;

        // A truncated result still carries the entries we asked for
        if result.rc != SIZE_LIMIT_EXCEEDED {
            check(result, &request.base)?;
        }

        Ok(entries
            .into_iter()
            .map(|entry| {
                let entry = SearchEntry::construct(entry);
                DirectoryEntry {
                    dn: entry.dn,
                    attributes: entry.attrs,
                }
            })
            .collect())
    }

    async fn add(&self, dn: &str, attributes: Attributes) -> Result<()> {
        let attributes = attributes
            .iter()
            .map(|(name, values)| {
                (
                    name.as_str(),
                    values.iter().map(String::as_str).collect::<HashSet<_>>(),
                )
            })
            .collect();

        let mut ldap = self.ldap.clone();
        let result = ldap.add(dn, attributes).await?;
        check(result, dn)
    }

    async fn replace(&self, dn: &str, attribute: &str, values: Vec<String>) -> Result<()> {
        let values: HashSet<&str> = values.iter().map(String::as_str).collect();

        let mut ldap = self.ldap.clone();
        let result = ldap.modify(dn, vec![Mod::Replace(attribute, values)]).await?;
        check(result, dn)
    }
}

fn check(result: LdapResult, dn: &str) -> Result<()> {
    match result.rc {
        SUCCESS => Ok(()),
        NO_SUCH_OBJECT => Err(ProvisionerError::NoSuchObject(dn.to_string())),
        _ => Err(LdapError::LdapResult { result }.into()),
    }
}

/// Plain hostnames are reached over LDAPS
fn ldap_url(hostname: &str) -> String {
    if hostname.contains("://") {
        hostname.to_string()
    } else {
        format!("ldaps://{}", hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(rc: u32) -> LdapResult {
        LdapResult {
            rc,
            matched: String::new(),
            text: String::new(),
            refs: Vec::new(),
            ctrls: Vec::new(),
        }
    }

    #[test]
    fn test_ldap_url() {
        assert_eq!(ldap_url("ldap.example.com"), "ldaps://ldap.example.com");
        assert_eq!(ldap_url("ldap://localhost:389"), "ldap://localhost:389");
    }

    #[test]
    fn test_check_maps_result_codes() {
        assert!(check(result(0), "OU=prd1811,DC=example,DC=com").is_ok());
        assert!(matches!(
            check(result(32), "OU=prd1811,DC=example,DC=com"),
            Err(ProvisionerError::NoSuchObject(dn)) if dn == "OU=prd1811,DC=example,DC=com"
        ));
        assert!(matches!(
            check(result(50), "OU=prd1811,DC=example,DC=com"),
            Err(ProvisionerError::LdapError(LdapError::LdapResult { result })) if result.rc == 50
        ));
    }
}
