// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for recallkeep
//!
//! Most of these never reach the host: lookups turn them into cache misses
//! and log a warning. They surface directly only from setup, the CLI and
//! explicit maintenance operations.

use thiserror::Error;

/// Main error type for recallkeep operations
#[derive(Error, Debug)]
pub enum RecallError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed record, segment or scratch data
    #[error("Codec error: {0}")]
    Codec(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Image URL resolution or download failures
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for recallkeep operations
pub type Result<T> = std::result::Result<T, RecallError>;
