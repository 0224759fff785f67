// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use crate::constants::{directory, inventory, tiller};
use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;

/// Controller configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the Namespace and dependent resource manifests
    pub manifests_dir: PathBuf,
    pub debug: bool,
    /// Regex every managed namespace name must match
    pub namespace_pattern: String,
    pub pim: PimConfig,
    pub tiller: TillerConfig,
    pub ldap: LdapConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PimConfig {
    pub base_url: String,
    pub api_version: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TillerConfig {
    /// Namespace annotation that requests a Tiller install
    pub annotation: String,
    pub default_version: String,
    pub image: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LdapConfig {
    pub enabled: bool,
    pub hostname: String,
    pub username: String,
    pub password: String,
    pub base_dn: String,
    pub common_org_units: String,
    /// Annotations named `<prefix>/<role>` become directory groups
    pub annotation_prefix: String,
    pub application: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key).with_context(|| format!("{} environment variable not set", key))
        };
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let flag = |key: &str| {
            lookup(key)
                .unwrap_or("false".to_string())
                .parse()
                .unwrap_or(false)
        };

        let pim = PimConfig {
            base_url: required("PIM_BASE_URL")?,
            api_version: or_default("PIM_API_VERSION", inventory::DEFAULT_API_VERSION),
            token: or_default("PIM_TOKEN", ""),
        };

        let tiller = TillerConfig {
            annotation: or_default("TILLER_ANNOTATION", tiller::DEFAULT_ANNOTATION),
            default_version: or_default("TILLER_DEFAULT_VERSION", tiller::DEFAULT_VERSION),
            image: or_default("TILLER_IMAGE", tiller::DEFAULT_IMAGE),
        };

        // Directory settings are only mandatory once group provisioning is switched on
        let enabled = flag("LDAP_ENABLED");
        let ldap_value = |key: &str| {
            if enabled {
                required(key)
            } else {
                Ok(or_default(key, ""))
            }
        };
        let ldap = LdapConfig {
            enabled,
            hostname: ldap_value("LDAP_HOSTNAME")?,
            username: ldap_value("LDAP_USERNAME")?,
            password: ldap_value("LDAP_PASSWORD")?,
            base_dn: ldap_value("LDAP_BASE_DN")?,
            common_org_units: ldap_value("LDAP_COMMON_ORG_UNITS")?,
            annotation_prefix: ldap_value("LDAP_ANNOTATION_PREFIX")?,
            application: or_default("LDAP_APPLICATION", directory::DEFAULT_APPLICATION),
        };

        Ok(Config {
            manifests_dir: PathBuf::from(required("MANIFESTS_DIR")?),
            debug: flag("DEBUG"),
            namespace_pattern: or_default("NAMESPACE_PATTERN", inventory::DEFAULT_NAMESPACE_PATTERN),
            pim,
            tiller,
            ldap,
        })
    }
}
