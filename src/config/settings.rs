// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for recallkeep
//!
//! Handles loading and saving settings from ~/.recallkeep/settings.json

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

mod io;
mod keys;
mod migration;
mod validation;

/// Main settings structure, stored in ~/.recallkeep/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Recall cache behavior and sizing
    #[serde(default)]
    pub recall: RecallSettings,

    /// Picture download settings
    #[serde(default)]
    pub image: ImageSettings,

    /// Where per-user caches live
    #[serde(default)]
    pub storage: StorageSettings,
}

/// Recall cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallSettings {
    /// Reconstruct recalled messages at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Recent messages kept in memory for matching
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,

    /// Recalled messages collected before writing a segment
    #[serde(default = "default_flush_threshold")]
    pub flush_threshold: usize,

    /// Decompressed segments kept in memory
    #[serde(default = "default_max_resident_segments")]
    pub max_resident_segments: usize,

    /// Keep recalled messages across restarts
    #[serde(default = "default_true")]
    pub persist_to_disk: bool,

    /// Copy pictures of recalled messages into the cache directory
    #[serde(default)]
    pub redirect_pictures: bool,

    /// Also reconstruct messages the current user recalled
    #[serde(default)]
    pub intercept_self_recall: bool,
}

/// Image service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSettings {
    /// Endpoint returning the current private/group rkeys
    #[serde(default)]
    pub rkey_server_url: Option<String>,

    /// Timeout for every image service request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Root of the per-user cache directories
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_true() -> bool {
    true
}

fn default_ring_capacity() -> usize {
    200
}

fn default_flush_threshold() -> usize {
    500
}

fn default_max_resident_segments() -> usize {
    5
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_data_dir() -> PathBuf {
    Settings::recallkeep_home().join("data")
}

impl Default for RecallSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ring_capacity: default_ring_capacity(),
            flush_threshold: default_flush_threshold(),
            max_resident_segments: default_max_resident_segments(),
            persist_to_disk: true,
            redirect_pictures: false,
            intercept_self_recall: false,
        }
    }
}

impl Default for ImageSettings {
    fn default() -> Self {
        Self {
            rkey_server_url: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}
