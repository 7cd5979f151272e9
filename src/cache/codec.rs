// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Binary codec for records, segments and scratch frames
//!
//! Records are serialized to JSON and zlib-compressed. Segment files carry a
//! 16-byte header ahead of the compressed record map:
//!
//! ```text
//! 0..8    magic "LTRECALL"
//! 8..12   format version, u32 little-endian
//! 12..16  record count, u32 little-endian
//! 16..    zlib(json(map<msg_id, record>))
//! ```
//!
//! Scratch frames are a u32 big-endian length followed by one compressed record.

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;
use tokio::io::AsyncReadExt;

use crate::error::{RecallError, Result};
use crate::message::MessageRecord;

/// Magic bytes at the start of every segment file
pub const SEGMENT_MAGIC: &[u8; 8] = b"LTRECALL";
/// Current segment format version
pub const SEGMENT_VERSION: u32 = 1;
/// Size of the segment header in bytes
pub const SEGMENT_HEADER_LEN: usize = 16;
/// Size of the scratch frame length prefix
pub const FRAME_PREFIX_LEN: usize = 4;

/// Map of message id to record, the body of a segment
pub type RecordMap = HashMap<String, MessageRecord>;

/// Header summary of a segment file, readable without touching the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Format version; `None` when the magic did not match
    pub version: Option<u32>,
    /// Number of records the segment claims to hold
    pub count: u32,
}

impl SegmentHeader {
    pub fn new(count: u32) -> Self {
        Self {
            version: Some(SEGMENT_VERSION),
            count,
        }
    }

    /// Marker for files whose header could not be recognized
    pub fn invalid() -> Self {
        Self {
            version: None,
            count: 0,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.version.is_some()
    }

    fn to_bytes(self) -> [u8; SEGMENT_HEADER_LEN] {
        let mut buf = [0u8; SEGMENT_HEADER_LEN];
        buf[..8].copy_from_slice(SEGMENT_MAGIC);
        buf[8..12].copy_from_slice(&self.version.unwrap_or(SEGMENT_VERSION).to_le_bytes());
        buf[12..16].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    /// Parse a header from the first bytes of a segment
    pub fn parse(bytes: &[u8]) -> Self {
        if bytes.len() < SEGMENT_HEADER_LEN || &bytes[..8] != SEGMENT_MAGIC {
            return Self::invalid();
        }
        let version = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let count = u32::from_le_bytes([bytes[12], bytes[13], bytes[14], bytes[15]]);
        Self {
            version: Some(version),
            count,
        }
    }
}

/// Compress data using zlib
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|e| RecallError::Codec(format!("Failed to compress: {}", e)))?;
    encoder
        .finish()
        .map_err(|e| RecallError::Codec(format!("Failed to finish compression: {}", e)))
}

/// Decompress zlib data
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut result = Vec::new();
    decoder
        .read_to_end(&mut result)
        .map_err(|e| RecallError::Codec(format!("Failed to decompress: {}", e)))?;
    Ok(result)
}

pub fn encode_record(record: &MessageRecord) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(record)?;
    compress(&json)
}

pub fn decode_record(bytes: &[u8]) -> Result<MessageRecord> {
    let json = decompress(bytes)?;
    serde_json::from_slice(&json)
        .map_err(|e| RecallError::Codec(format!("Failed to deserialize record: {}", e)))
}

/// Encode a record map as a complete segment file image
pub fn encode_segment(records: &RecordMap) -> Result<Vec<u8>> {
    let count = u32::try_from(records.len())
        .map_err(|_| RecallError::Codec(format!("Too many records: {}", records.len())))?;
    let json = serde_json::to_vec(records)?;
    let body = compress(&json)?;

    let mut out = Vec::with_capacity(SEGMENT_HEADER_LEN + body.len());
    out.extend_from_slice(&SegmentHeader::new(count).to_bytes());
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a segment file image, validating its header against the body
pub fn decode_segment(bytes: &[u8]) -> Result<RecordMap> {
    let header = SegmentHeader::parse(bytes);
    let version = header
        .version
        .ok_or_else(|| RecallError::Codec("Bad segment magic".to_string()))?;
    if version != SEGMENT_VERSION {
        return Err(RecallError::Codec(format!(
            "Unsupported segment version: {}",
            version
        )));
    }

    let json = decompress(&bytes[SEGMENT_HEADER_LEN..])?;
    let records: RecordMap = serde_json::from_slice(&json)
        .map_err(|e| RecallError::Codec(format!("Failed to deserialize segment: {}", e)))?;

    if records.len() != header.count as usize {
        return Err(RecallError::Codec(format!(
            "Segment header claims {} records, body holds {}",
            header.count,
            records.len()
        )));
    }

    Ok(records)
}

/// Read only the header of a segment file.
///
/// Files that are too short or carry the wrong magic yield
/// [`SegmentHeader::invalid`]; only failing to read the file is an error.
pub async fn read_segment_header(path: &Path) -> Result<SegmentHeader> {
    let file = tokio::fs::File::open(path).await?;
    let mut buf = Vec::with_capacity(SEGMENT_HEADER_LEN);
    file.take(SEGMENT_HEADER_LEN as u64)
        .read_to_end(&mut buf)
        .await?;
    Ok(SegmentHeader::parse(&buf))
}

/// Encode a record as one length-prefixed scratch frame
pub fn encode_frame(record: &MessageRecord) -> Result<Vec<u8>> {
    let payload = encode_record(record)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| RecallError::Codec(format!("Record too large: {} bytes", payload.len())))?;

    let mut frame = Vec::with_capacity(FRAME_PREFIX_LEN + payload.len());
    frame.extend_from_slice(&len.to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}
