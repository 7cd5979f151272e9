// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Reading recorded host streams
//!
//! A recording is a JSON-lines file: each non-blank line is one batch, an
//! array of host messages exactly as the host delivered them.

use std::path::Path;

use crate::error::{RecallError, Result};
use crate::message::{HostMessage, StreamElement};

/// Parse one line into a classified batch
pub fn parse_batch_line(line: &str) -> Result<Vec<StreamElement>> {
    let messages: Vec<HostMessage> = serde_json::from_str(line)?;
    Ok(messages.into_iter().map(HostMessage::classify).collect())
}

/// Read every batch of a recording.
///
/// A malformed line fails the whole read with its line number.
pub async fn read_batches(path: &Path) -> Result<Vec<Vec<StreamElement>>> {
    let content = tokio::fs::read_to_string(path).await?;

    let mut batches = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let batch = parse_batch_line(line).map_err(|e| {
            RecallError::InvalidInput(format!("{}:{}: {}", path.display(), index + 1, e))
        })?;
        batches.push(batch);
    }

    tracing::debug!("Read {} batch(es) from {}", batches.len(), path.display());
    Ok(batches)
}
