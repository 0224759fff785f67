// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{Namespace, Service, ServiceAccount};
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::warn;

/// The resource kinds this controller knows how to load and apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Namespace,
    Deployment,
    RoleBinding,
    ServiceAccount,
    Service,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 5] = [
        ResourceKind::Namespace,
        ResourceKind::Deployment,
        ResourceKind::RoleBinding,
        ResourceKind::ServiceAccount,
        ResourceKind::Service,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Namespace => "Namespace",
            ResourceKind::Deployment => "Deployment",
            ResourceKind::RoleBinding => "RoleBinding",
            ResourceKind::ServiceAccount => "ServiceAccount",
            ResourceKind::Service => "Service",
        }
    }

    /// Map a manifest's `kind` field, `None` for kinds outside the supported set
    pub fn from_kind(kind: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == kind)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single decoded resource, tagged by kind
#[derive(Debug, Clone)]
pub enum Manifest {
    Namespace(Namespace),
    Deployment(Deployment),
    RoleBinding(RoleBinding),
    ServiceAccount(ServiceAccount),
    Service(Service),
}

impl Manifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Manifest::Namespace(_) => ResourceKind::Namespace,
            Manifest::Deployment(_) => ResourceKind::Deployment,
            Manifest::RoleBinding(_) => ResourceKind::RoleBinding,
            Manifest::ServiceAccount(_) => ResourceKind::ServiceAccount,
            Manifest::Service(_) => ResourceKind::Service,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Manifest::Namespace(o) => o.name_any(),
            Manifest::Deployment(o) => o.name_any(),
            Manifest::RoleBinding(o) => o.name_any(),
            Manifest::ServiceAccount(o) => o.name_any(),
            Manifest::Service(o) => o.name_any(),
        }
    }

    /// The namespace a dependent resource belongs to; `None` for namespaces themselves
    pub fn namespace(&self) -> Option<String> {
        match self {
            Manifest::Namespace(_) => None,
            Manifest::Deployment(o) => o.namespace(),
            Manifest::RoleBinding(o) => o.namespace(),
            Manifest::ServiceAccount(o) => o.namespace(),
            Manifest::Service(o) => o.namespace(),
        }
    }
}

/// Every manifest found in a directory scan, routed into per-kind collections
#[derive(Debug, Clone, Default)]
pub struct ManifestSet {
    pub namespaces: Vec<Namespace>,
    pub deployments: Vec<Deployment>,
    pub role_bindings: Vec<RoleBinding>,
    pub service_accounts: Vec<ServiceAccount>,
    pub services: Vec<Service>,
}

impl ManifestSet {
    pub fn insert(&mut self, manifest: Manifest) {
        match manifest {
            Manifest::Namespace(o) => self.namespaces.push(o),
            Manifest::Deployment(o) => self.deployments.push(o),
            Manifest::RoleBinding(o) => self.role_bindings.push(o),
            Manifest::ServiceAccount(o) => self.service_accounts.push(o),
            Manifest::Service(o) => self.services.push(o),
        }
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
            + self.deployments.len()
            + self.role_bindings.len()
            + self.service_accounts.len()
            + self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Group dependent resources under the namespace they declare.
    ///
    /// Resources pointing at a namespace that is not part of the set are
    /// logged and left out. Only the first declaration of a namespace is kept.
    pub fn into_namespace_manifests(self) -> Vec<NamespaceManifest> {
        let mut manifests: Vec<NamespaceManifest> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for namespace in self.namespaces {
            let name = namespace.name_any();
            if index.contains_key(&name) {
                warn!("Namespace {} is declared more than once, keeping the first", name);
                continue;
            }
            index.insert(name, manifests.len());
            manifests.push(NamespaceManifest::new(namespace));
        }

        let dependents = self
            .deployments
            .into_iter()
            .map(Manifest::Deployment)
            .chain(self.role_bindings.into_iter().map(Manifest::RoleBinding))
            .chain(self.service_accounts.into_iter().map(Manifest::ServiceAccount))
            .chain(self.services.into_iter().map(Manifest::Service));

        for manifest in dependents {
            let target = manifest.namespace().and_then(|ns| index.get(&ns).copied());
            match target {
                Some(i) => manifests[i].push(manifest),
                None => warn!(
                    "{} {} targets undeclared namespace {:?}, skipping",
                    manifest.kind(),
                    manifest.name(),
                    manifest.namespace()
                ),
            }
        }

        manifests
    }
}

/// A namespace and the dependent resources to reconcile alongside it
#[derive(Debug, Clone)]
pub struct NamespaceManifest {
    pub namespace: Namespace,
    pub deployments: Vec<Deployment>,
    pub role_bindings: Vec<RoleBinding>,
    pub service_accounts: Vec<ServiceAccount>,
    pub services: Vec<Service>,
}

impl NamespaceManifest {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            deployments: Vec::new(),
            role_bindings: Vec::new(),
            service_accounts: Vec::new(),
            services: Vec::new(),
        }
    }

    pub fn name(&self) -> String {
        self.namespace.name_any()
    }

    pub fn annotations(&self) -> &BTreeMap<String, String> {
        self.namespace.annotations()
    }

    /// Merge annotations into the namespace object, incoming values win
    pub fn add_annotations(&mut self, incoming: BTreeMap<String, String>) {
        let merged = merge_annotations(self.namespace.metadata.annotations.take(), incoming);
        self.namespace.metadata.annotations = Some(merged);
    }

    /// Add a dependent resource. A nested Namespace is not a dependent and is dropped with a warning.
    pub fn push(&mut self, manifest: Manifest) {
        match manifest {
            Manifest::Namespace(o) => warn!(
                "Ignoring Namespace {} added as a dependent of {}",
                o.name_any(),
                self.name()
            ),
            Manifest::Deployment(o) => self.deployments.push(o),
            Manifest::RoleBinding(o) => self.role_bindings.push(o),
            Manifest::ServiceAccount(o) => self.service_accounts.push(o),
            Manifest::Service(o) => self.services.push(o),
        }
    }

    pub fn extend(&mut self, manifests: impl IntoIterator<Item = Manifest>) {
        for manifest in manifests {
            self.push(manifest);
        }
    }

    pub fn dependent_count(&self) -> usize {
        self.deployments.len()
            + self.role_bindings.len()
            + self.service_accounts.len()
            + self.services.len()
    }
}

/// Union of both maps; on a key collision the incoming value replaces the existing one
pub fn merge_annotations(
    existing: Option<BTreeMap<String, String>>,
    incoming: BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = existing.unwrap_or_default();
    merged.extend(incoming);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::api::ObjectMeta;

    fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn service(name: &str, namespace: &str) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_annotations_incoming_wins() {
        let merged = merge_annotations(
            Some(map(&[("a", "1"), ("b", "2")])),
            map(&[("b", "3"), ("c", "4")]),
        );

        assert_eq!(merged, map(&[("a", "1"), ("b", "3"), ("c", "4")]));
    }

    #[test]
    fn test_merge_annotations_without_existing() {
        let merged = merge_annotations(None, map(&[("c", "4")]));
        assert_eq!(merged, map(&[("c", "4")]));
    }

    #[test]
    fn test_resource_kind_round_trips_through_kind_string() {
        for kind in ResourceKind::ALL {
            assert_eq!(ResourceKind::from_kind(kind.as_str()), Some(kind));
        }
        assert_eq!(ResourceKind::from_kind("ConfigMap"), None);
    }

    #[test]
    fn test_manifest_set_routes_by_kind() {
        let mut set = ManifestSet::default();
        set.insert(Manifest::Namespace(namespace("prd1811")));
        set.insert(Manifest::Service(service("api", "prd1811")));

        assert_eq!(set.namespaces.len(), 1);
        assert_eq!(set.services.len(), 1);
        assert!(set.deployments.is_empty());
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_into_namespace_manifests_groups_dependents() {
        let mut set = ManifestSet::default();
        set.insert(Manifest::Namespace(namespace("prd1811")));
        set.insert(Manifest::Namespace(namespace("prd354")));
        set.insert(Manifest::Service(service("api", "prd354")));
        set.insert(Manifest::Service(service("orphan", "prd999")));

        let manifests = set.into_namespace_manifests();

        assert_eq!(manifests.len(), 2);
        assert_eq!(manifests[0].name(), "prd1811");
        assert_eq!(manifests[0].dependent_count(), 0);
        assert_eq!(manifests[1].services.len(), 1);
        assert_eq!(manifests[1].services[0].name_any(), "api");
    }

    #[test]
    fn test_into_namespace_manifests_keeps_first_duplicate() {
        let mut first = namespace("prd1811");
        first.metadata.annotations = Some(map(&[("copy", "first")]));
        let mut second = namespace("prd1811");
        second.metadata.annotations = Some(map(&[("copy", "second")]));

        let mut set = ManifestSet::default();
        set.insert(Manifest::Namespace(first));
        set.insert(Manifest::Namespace(second));
        set.insert(Manifest::Service(service("api", "prd1811")));

        let manifests = set.into_namespace_manifests();

        assert_eq!(manifests.len(), 1);
        assert_eq!(manifests[0].annotations()["copy"], "first");
        assert_eq!(manifests[0].services.len(), 1);
    }

    #[test]
    fn test_add_annotations_overrides_declared_values() {
        let mut ns = namespace("prd1811");
        ns.metadata.annotations = Some(map(&[("team", "old"), ("keep", "yes")]));
        let mut manifest = NamespaceManifest::new(ns);

        manifest.add_annotations(map(&[("team", "new")]));

        assert_eq!(manifest.annotations(), &map(&[("keep", "yes"), ("team", "new")]));
    }
}
