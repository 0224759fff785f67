// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! HTTP client for the Product Inventory Management API

use super::{Asset, InventoryClient};
use crate::config::PimConfig;
use crate::constants::inventory::BASE_PATH;
use crate::error::{ProvisionerError, Result};
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const USER_AGENT: &str = concat!("namespace-provisioner/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetItems {
    #[serde(default)]
    items: Vec<Asset>,
}

pub struct PimClient {
    http_client: reqwest::Client,
    asset_url: Url,
    token: String,
}

impl PimClient {
    pub fn new(config: &PimConfig) -> Result<Self> {
        let asset_url = asset_url(&config.base_url, &config.api_version)?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http_client,
            asset_url,
            token: config.token.clone(),
        })
    }
}

/// Append `tkm/<version>/asset` to the base URL, keeping any path prefix
fn asset_url(base_url: &str, api_version: &str) -> Result<Url> {
    let mut url = Url::parse(base_url).map_err(|e| {
        ProvisionerError::Inventory(format!("Invalid PIM base URL {}: {}", base_url, e))
    })?;
    url.path_segments_mut()
        .map_err(|_| ProvisionerError::Inventory(format!("PIM base URL {} cannot have a path", base_url)))?
        .pop_if_empty()
        .extend([BASE_PATH, api_version, "asset"]);
    Ok(url)
}

#[async_trait]
impl InventoryClient for PimClient {
    #[instrument(skip(self), fields(url = %self.asset_url))]
    async fn query(&self, params: &BTreeMap<String, String>) -> Result<Vec<Asset>> {
        let response = self
            .http_client
            .get(self.asset_url.clone())
            .query(params)
            .header(ACCEPT, "application/json")
            .header(COOKIE, format!("token={}", self.token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ProvisionerError::Inventory(format!(
                "PIM returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let assets: AssetItems = response.json().await?;
        debug!("PIM returned {} assets", assets.items.len());
        Ok(assets.items)
    }
}
