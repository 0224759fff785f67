// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Namespace ownership metadata from the product inventory.

pub mod pim;

pub use pim::PimClient;

use crate::constants::{annotations, inventory::ASSET_TYPE};
use crate::error::{ProvisionerError, Result};
use crate::retry::{retry, RetryPolicy};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A product record as returned by the inventory
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    #[serde(default)]
    pub product_code_name: String,
    #[serde(default)]
    pub doc: AssetDoc,
}

/// Ownership fields of a product document; everything else in the document is ignored
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AssetDoc {
    pub name: String,
    pub on_call_info: String,
    pub slack_channel: String,
    pub support_email: String,
    pub tech_owner: String,
}

impl Asset {
    /// Mandatory ownership fields that are empty on this record
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("TechOwner", &self.doc.tech_owner),
            ("SlackChannel", &self.doc.slack_channel),
            ("SupportEmail", &self.doc.support_email),
            ("OnCallInfo", &self.doc.on_call_info),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn to_annotations(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (annotations::NAME.to_string(), self.doc.name.clone()),
            (annotations::ONCALL_INFO.to_string(), self.doc.on_call_info.clone()),
            (annotations::PRODUCT_CODE.to_string(), self.product_code_name.clone()),
            (annotations::SLACK_CHANNEL.to_string(), self.doc.slack_channel.clone()),
            (annotations::SUPPORT_EMAIL.to_string(), self.doc.support_email.clone()),
            (annotations::TECH_OWNER.to_string(), self.doc.tech_owner.clone()),
        ])
    }
}

/// Read-only query access to the inventory
#[async_trait]
pub trait InventoryClient: Send + Sync {
    async fn query(&self, params: &BTreeMap<String, String>) -> Result<Vec<Asset>>;
}

/// Validates namespace names and turns inventory records into namespace annotations
pub struct InventoryAnnotator {
    client: Arc<dyn InventoryClient>,
    pattern: Regex,
    policy: RetryPolicy,
}

impl InventoryAnnotator {
    pub fn new(client: Arc<dyn InventoryClient>, pattern: &str) -> Result<Self> {
        let pattern = Regex::new(pattern).map_err(|source| ProvisionerError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            client,
            pattern,
            policy: RetryPolicy::inventory(),
        })
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn validate_namespace(&self, name: &str) -> Result<()> {
        if self.pattern.is_match(name) {
            Ok(())
        } else {
            Err(ProvisionerError::InvalidNamespaceName {
                name: name.to_string(),
                pattern: self.pattern.as_str().to_string(),
            })
        }
    }

    /// Fetch the product matching `name` and project it into namespace annotations
    #[instrument(skip(self))]
    pub async fn prepare_annotations(&self, name: &str) -> Result<BTreeMap<String, String>> {
        let product_code = name.to_uppercase();
        let products = self.fetch_products(&product_code).await?;

        let Some(product) = products.first() else {
            return Err(ProvisionerError::NoProductFound(product_code));
        };
        if products.len() > 1 {
            warn!("{} products match {}, using the first", products.len(), product_code);
        }

        let missing = product.missing_fields();
        if !missing.is_empty() {
            return Err(ProvisionerError::IncompleteInventoryRecord {
                product_code,
                missing,
            });
        }

        info!("Loaded ownership annotations for {}", product_code);
        Ok(product.to_annotations())
    }

    async fn fetch_products(&self, product_code: &str) -> Result<Vec<Asset>> {
        let params = BTreeMap::from([
            ("assetTypeName".to_string(), ASSET_TYPE.to_string()),
            ("deleted".to_string(), "false".to_string()),
            ("prdCodes".to_string(), product_code.to_string()),
        ]);

        debug!("Querying inventory for {}", product_code);
        retry(&self.policy, |_| true, || self.client.query(&params)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Serves canned products and fails the first `failures` calls
    struct FakeInventory {
        failures: u32,
        calls: AtomicU32,
    }

    impl FakeInventory {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
            }
        }
    }

    fn asset(code: &str, tech_owner: &str) -> Asset {
        Asset {
            product_code_name: code.to_string(),
            doc: AssetDoc {
                name: "CICD".to_string(),
                on_call_info: "devx-oncall@example.pagerduty.com".to_string(),
                slack_channel: "#gitlab".to_string(),
                support_email: "devx@example.com".to_string(),
                tech_owner: tech_owner.to_string(),
            },
        }
    }

    #[async_trait]
    impl InventoryClient for FakeInventory {
        async fn query(&self, params: &BTreeMap<String, String>) -> Result<Vec<Asset>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(ProvisionerError::Inventory("connection reset".to_string()));
            }

            assert_eq!(params["assetTypeName"], "Product");
            assert_eq!(params["deleted"], "false");
            match params["prdCodes"].as_str() {
                "PRD1811" => Ok(vec![asset("PRD1811", "Andy Chan")]),
                "PRD367" => Ok(vec![asset("PRD367", "")]),
                "PRD42" => Ok(vec![asset("PRD42", "First"), asset("PRD42", "Second")]),
                "TEST9" => Err(ProvisionerError::Inventory("boom".to_string())),
                _ => Ok(Vec::new()),
            }
        }
    }

    fn annotator(inventory: Arc<FakeInventory>) -> InventoryAnnotator {
        InventoryAnnotator::new(inventory, "^prd[1-9]{1,5}$")
            .unwrap()
            .with_retry_policy(
                RetryPolicy::inventory()
                    .with_initial_delay(Duration::from_millis(1))
                    .with_max_elapsed(Duration::from_millis(200))
                    .with_jitter(0.0),
            )
    }

    #[test]
    fn test_validate_namespace_default_pattern() {
        let annotator = annotator(Arc::new(FakeInventory::new(0)));

        assert!(annotator.validate_namespace("prd1811").is_ok());
        assert!(matches!(
            annotator.validate_namespace("test9"),
            Err(ProvisionerError::InvalidNamespaceName { .. })
        ));
    }

    #[test]
    fn test_validate_namespace_custom_pattern() {
        let annotator =
            InventoryAnnotator::new(Arc::new(FakeInventory::new(0)), "^test[1-9]{1}$").unwrap();

        assert!(annotator.validate_namespace("test9").is_ok());
        assert!(annotator.validate_namespace("prd1811").is_err());
    }

    #[tokio::test]
    async fn test_prepare_annotations_complete_record() {
        let found = annotator(Arc::new(FakeInventory::new(0)))
            .prepare_annotations("prd1811")
            .await
            .unwrap();

        assert_eq!(found.len(), 6);
        assert_eq!(found[annotations::NAME], "CICD");
        assert_eq!(found[annotations::PRODUCT_CODE], "PRD1811");
        assert_eq!(found[annotations::TECH_OWNER], "Andy Chan");
        assert_eq!(found[annotations::SLACK_CHANNEL], "#gitlab");
        assert_eq!(found[annotations::SUPPORT_EMAIL], "devx@example.com");
        assert_eq!(
            found[annotations::ONCALL_INFO],
            "devx-oncall@example.pagerduty.com"
        );
    }

    #[tokio::test]
    async fn test_prepare_annotations_incomplete_record() {
        let err = annotator(Arc::new(FakeInventory::new(0)))
            .prepare_annotations("prd367")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ProvisionerError::IncompleteInventoryRecord { ref missing, .. } if missing == &vec!["TechOwner"]
        ));
    }

    #[tokio::test]
    async fn test_prepare_annotations_no_product() {
        let err = annotator(Arc::new(FakeInventory::new(0)))
            .prepare_annotations("prd999")
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionerError::NoProductFound(code) if code == "PRD999"));
    }

    #[tokio::test]
    async fn test_prepare_annotations_uses_first_match() {
        let found = annotator(Arc::new(FakeInventory::new(0)))
            .prepare_annotations("prd42")
            .await
            .unwrap();

        assert_eq!(found[annotations::TECH_OWNER], "First");
    }

    #[tokio::test]
    async fn test_prepare_annotations_retries_transient_errors() {
        let inventory = Arc::new(FakeInventory::new(2));

        let found = annotator(inventory.clone())
            .prepare_annotations("prd1811")
            .await
            .unwrap();

        assert_eq!(found.len(), 6);
        assert_eq!(inventory.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_prepare_annotations_surfaces_last_error_after_budget() {
        let inventory = Arc::new(FakeInventory::new(0));

        let err = annotator(inventory.clone())
            .prepare_annotations("test9")
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionerError::Inventory(msg) if msg == "boom"));
        assert!(inventory.calls.load(Ordering::SeqCst) > 1);
    }
}
