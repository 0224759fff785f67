// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0
pub mod config;
pub mod constants;
pub mod directory;
pub mod error;
pub mod inventory;
pub mod kubernetes;
pub mod manifest;
pub mod pipeline;
pub mod retry;
pub mod tiller;
pub mod types;

#[cfg(test)]
pub mod test_utils;
