// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Scratch mirror of the active recall buffer
//!
//! Every record promoted into the active buffer is appended here as one
//! length-prefixed frame, so the buffer can be rebuilt after a restart.
//! The file is truncated whenever the buffer is flushed into a segment.

use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use super::codec::{decode_record, encode_frame, FRAME_PREFIX_LEN};
use crate::error::Result;
use crate::message::MessageRecord;

/// File name of the scratch mirror inside the store directory
pub const SCRATCH_FILE_NAME: &str = "active_recall.log";

/// Why replay stopped before the end of the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayStop {
    /// A frame header or payload ran past end-of-file
    Truncated { offset: usize },
    /// A complete frame held bytes that did not decode
    Corrupt { offset: usize },
}

/// Result of replaying the scratch mirror
#[derive(Debug, Clone, Default)]
pub struct Replay {
    /// Records in the order they were appended
    pub records: Vec<MessageRecord>,
    /// Set when replay ended early
    pub stopped: Option<ReplayStop>,
}

/// Append-only mirror file
pub struct ScratchMirror {
    path: PathBuf,
}

impl ScratchMirror {
    /// Open the mirror in `dir`, creating an empty file if none exists
    pub async fn open(dir: &Path) -> Result<Self> {
        let path = dir.join(SCRATCH_FILE_NAME);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record
    pub async fn append(&mut self, record: &MessageRecord) -> Result<()> {
        let frame = encode_frame(record)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&frame).await?;
        file.flush().await?;

        tracing::debug!("Appended {} to scratch mirror", record.msg_id);
        Ok(())
    }

    /// Read back every complete record
    pub async fn replay(&self) -> Result<Replay> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Replay::default()),
            Err(e) => return Err(e.into()),
        };
        Ok(parse_frames(&data))
    }

    /// Drop all content, leaving an empty file
    pub async fn truncate(&mut self) -> Result<()> {
        tokio::fs::write(&self.path, b"").await?;
        Ok(())
    }

    /// Current size of the mirror in bytes
    pub async fn len(&self) -> Result<u64> {
        Ok(tokio::fs::metadata(&self.path).await?.len())
    }
}

/// Parse length-prefixed frames, stopping at the first incomplete or bad one
pub fn parse_frames(data: &[u8]) -> Replay {
    let mut replay = Replay::default();
    let mut offset = 0usize;

    while offset < data.len() {
        if offset + FRAME_PREFIX_LEN > data.len() {
            tracing::warn!(
                "Scratch mirror truncated inside a length prefix at offset {}",
                offset
            );
            replay.stopped = Some(ReplayStop::Truncated { offset });
            break;
        }

        let prefix = [
            data[offset],
            data[offset + 1],
            data[offset + 2],
            data[offset + 3],
        ];
        let len = u32::from_be_bytes(prefix) as usize;
        let start = offset + FRAME_PREFIX_LEN;

        if len > data.len() - start {
            tracing::warn!(
                "Scratch mirror entry at offset {} declares {} bytes, only {} remain; stopping replay",
                offset,
                len,
                data.len() - start
            );
            replay.stopped = Some(ReplayStop::Truncated { offset });
            break;
        }

        match decode_record(&data[start..start + len]) {
            Ok(record) => replay.records.push(record),
            Err(e) => {
                tracing::warn!("Bad scratch mirror entry at offset {}: {}", offset, e);
                replay.stopped = Some(ReplayStop::Corrupt { offset });
                break;
            }
        }

        offset = start + len;
    }

    replay
}
