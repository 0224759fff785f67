// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Directory (LDAP) access control groups for namespaces.

pub mod ldap;
pub mod provisioner;

pub use self::ldap::LdapDirectory;
pub use provisioner::{DirectoryReport, GroupProvisioner};

use crate::constants::directory::{LOOKUP_SIZE_LIMIT, MEMBER_SIZE_LIMIT};
use crate::error::{ProvisionerError, Result};
use async_trait::async_trait;
use ldap3::ldap_escape;
use std::collections::HashMap;
use std::fmt;

/// Attribute name and values for a new directory entry
pub type Attributes = Vec<(String, Vec<String>)>;

/// An entry returned by a directory search
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectoryEntry {
    pub dn: String,
    pub attributes: HashMap<String, Vec<String>>,
}

/// The lookups the provisioner issues; rendered as LDAP filter strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    OrganizationalUnit(String),
    Group(String),
    /// Matches a user by account name or common name
    User(String),
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::OrganizationalUnit(ou) => {
                write!(f, "(&(objectClass=organizationalUnit)(ou={}))", ldap_escape(ou.as_str()))
            }
            Filter::Group(cn) => write!(f, "(&(objectClass=group)(cn={}))", ldap_escape(cn.as_str())),
            Filter::User(name) => {
                let name = ldap_escape(name.as_str());
                write!(f, "(&(objectClass=user)(|(sAMAccountName={})(CN={})))", name, name)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub base: String,
    pub filter: Filter,
    pub size_limit: i32,
    pub attributes: Vec<&'static str>,
}

impl SearchRequest {
    pub fn organizational_unit(base: &str, ou: &str) -> Self {
        Self {
            base: base.to_string(),
            filter: Filter::OrganizationalUnit(ou.to_string()),
            size_limit: LOOKUP_SIZE_LIMIT,
            attributes: vec!["dn"],
        }
    }

    pub fn group(base: &str, cn: &str) -> Self {
        Self {
            base: base.to_string(),
            filter: Filter::Group(cn.to_string()),
            size_limit: LOOKUP_SIZE_LIMIT,
            attributes: vec!["dn", "member"],
        }
    }

    pub fn user(base: &str, name: &str) -> Self {
        Self {
            base: base.to_string(),
            filter: Filter::User(name.to_string()),
            size_limit: MEMBER_SIZE_LIMIT,
            attributes: vec!["dn"],
        }
    }
}

/// The directory operations group provisioning needs.
///
/// A search or write under a base that does not exist must fail with
/// [`ProvisionerError::NoSuchObject`].
#[async_trait]
pub trait Directory: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>>;

    async fn add(&self, dn: &str, attributes: Attributes) -> Result<()>;

    /// Replace every value of `attribute` on `dn`
    async fn replace(&self, dn: &str, attribute: &str, values: Vec<String>) -> Result<()>;
}

/// Split a DN into its leading RDN value and the parent DN
pub fn split_dn(dn: &str) -> Result<(&str, &str)> {
    let invalid = || ProvisionerError::InvalidDn(dn.to_string());
    let (attribute, rest) = dn.split_once('=').ok_or_else(invalid)?;
    let (name, parent) = rest.split_once(',').ok_or_else(invalid)?;
    if attribute.is_empty() || name.is_empty() || parent.is_empty() {
        return Err(invalid());
    }
    Ok((name, parent))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_dn() {
        let (name, parent) =
            split_dn("CN=kubernetes-prd1811-admins,OU=prd1811,OU=Groups,DC=example,DC=com").unwrap();

        assert_eq!(name, "kubernetes-prd1811-admins");
        assert_eq!(parent, "OU=prd1811,OU=Groups,DC=example,DC=com");
    }

    #[test]
    fn test_split_dn_without_parent() {
        assert!(matches!(split_dn("DC=com"), Err(ProvisionerError::InvalidDn(_))));
        assert!(matches!(split_dn("not a dn"), Err(ProvisionerError::InvalidDn(_))));
    }

    #[test]
    fn test_filters_render() {
        assert_eq!(
            Filter::OrganizationalUnit("prd1811".to_string()).to_string(),
            "(&(objectClass=organizationalUnit)(ou=prd1811))"
        );
        assert_eq!(
            Filter::Group("kubernetes-prd1811-admins".to_string()).to_string(),
            "(&(objectClass=group)(cn=kubernetes-prd1811-admins))"
        );
        assert_eq!(
            Filter::User("alice".to_string()).to_string(),
            "(&(objectClass=user)(|(sAMAccountName=alice)(CN=alice)))"
        );
    }

    #[test]
    fn test_filter_values_are_escaped() {
        let filter = Filter::User("a*)(cn=b".to_string()).to_string().to_lowercase();

        assert_eq!(
            filter,
            "(&(objectclass=user)(|(samaccountname=a\\2a\\29\\28cn=b)(cn=a\\2a\\29\\28cn=b)))"
        );
    }

    #[test]
    fn test_search_request_limits() {
        let ou = SearchRequest::organizational_unit("OU=Groups,DC=example,DC=com", "prd1811");
        assert_eq!(ou.size_limit, 2);
        assert_eq!(ou.attributes, vec!["dn"]);

        let group = SearchRequest::group("OU=prd1811,DC=example,DC=com", "kubernetes-prd1811-admins");
        assert_eq!(group.attributes, vec!["dn", "member"]);

        let user = SearchRequest::user("DC=example,DC=com", "alice");
        assert_eq!(user.size_limit, 1000);
    }
}
