// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// Namespace annotation keys written from the product inventory
pub mod annotations {
    pub const NAME: &str = "example.com/name";
    pub const ONCALL_INFO: &str = "example.com/oncall-info";
    pub const PRODUCT_CODE: &str = "example.com/productcode";
    pub const SLACK_CHANNEL: &str = "example.com/slack-channel";
    pub const SUPPORT_EMAIL: &str = "example.com/support-email";
    pub const TECH_OWNER: &str = "example.com/tech-owner";
    /// Set on the synthesized Service to link it back to the inventory
    pub const INVENTORY_CODE: &str = "example.com/inventorycode";
}

/// Product inventory query settings
pub mod inventory {
    pub const ASSET_TYPE: &str = "Product";
    /// Default namespace naming rule, a product code such as `prd1811`
    pub const DEFAULT_NAMESPACE_PATTERN: &str = "^prd[1-9]{1,5}$";
    pub const DEFAULT_API_VERSION: &str = "v1";
    pub const BASE_PATH: &str = "tkm";
    /// Wall-clock budget across all retries of a single inventory lookup
    pub const MAX_ELAPSED_SECS: u64 = 10;
}

/// Defaults for the synthesized Tiller bundle
pub mod tiller {
    pub const NAME: &str = "tiller";
    pub const DEFAULT_ANNOTATION: &str = "example.com/tiller";
    pub const DEFAULT_VERSION: &str = "v2.9.1";
    pub const DEFAULT_IMAGE: &str = "gcr.io/kubernetes-helm/tiller";
    pub const CLUSTER_ROLE: &str = "tm:tiller";
    pub const APP_PORT: i32 = 44134;
    pub const HEALTH_PORT: i32 = 44135;
}

/// Directory group provisioning defaults
pub mod directory {
    pub const DEFAULT_APPLICATION: &str = "kubernetes";
    /// LDAP result code for "No Such Object"
    pub const NO_SUCH_OBJECT: u32 = 32;
    pub const LOOKUP_SIZE_LIMIT: i32 = 2;
    pub const MEMBER_SIZE_LIMIT: i32 = 1000;
}

/// Optimistic-concurrency retry on cluster writes
pub mod conflict {
    pub const MAX_ATTEMPTS: u32 = 5;
    pub const BASE_DELAY_MILLIS: u64 = 10;
}
