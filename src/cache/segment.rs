// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Persisted segment store
//!
//! Each flush of the active buffer becomes one immutable file named by its
//! creation time in epoch milliseconds (`<ms>.bin`). The index is rebuilt at
//! startup from headers alone; bodies are decompressed on demand and kept in
//! a small resident set.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::codec::{decode_segment, encode_segment, read_segment_header, RecordMap, SegmentHeader};
use crate::error::{RecallError, Result};
use crate::message::MessageRecord;

/// Extension of segment files
pub const SEGMENT_EXTENSION: &str = "bin";

/// Segment file naming
pub fn segment_filename(timestamp: i64) -> String {
    format!("{}.{}", timestamp, SEGMENT_EXTENSION)
}

/// Parse the creation timestamp from a segment filename
pub fn parse_segment_filename(filename: &str) -> Option<i64> {
    let stem = filename.strip_suffix(".bin")?;
    if stem.is_empty() || !stem.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    stem.parse::<i64>().ok()
}

/// One persisted segment file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Creation time, epoch milliseconds
    pub timestamp: i64,
    pub path: PathBuf,
    pub header: SegmentHeader,
}

/// Index of segment files plus the resident decompressed bodies
pub struct SegmentStore {
    dir: PathBuf,
    /// Ascending by timestamp
    segments: Vec<Segment>,
    /// Decompressed bodies keyed by path; evicts the earliest loaded
    loaded: LruCache<PathBuf, Arc<RecordMap>>,
}

impl SegmentStore {
    /// Open the store in `dir` and index existing segments
    pub async fn open(dir: PathBuf, max_resident: usize) -> Result<Self> {
        tokio::fs::create_dir_all(&dir).await?;

        let max_resident = NonZeroUsize::new(max_resident).unwrap_or(NonZeroUsize::MIN);
        let mut store = Self {
            dir,
            segments: Vec::new(),
            loaded: LruCache::new(max_resident),
        };
        store.rescan().await?;

        tracing::info!(
            "Indexed {} segment(s) in {}",
            store.segments.len(),
            store.dir.display()
        );
        Ok(store)
    }

    /// Rebuild the index from the directory, reading headers only
    pub async fn rescan(&mut self) -> Result<()> {
        let mut segments = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let filename = entry.file_name();
            let filename = filename.to_string_lossy();

            let Some(timestamp) = parse_segment_filename(&filename) else {
                continue;
            };

            let path = entry.path();
            let header = match read_segment_header(&path).await {
                Ok(header) => header,
                Err(e) => {
                    tracing::warn!("Failed to read segment header {:?}: {}", path, e);
                    SegmentHeader::invalid()
                }
            };
            if !header.is_valid() {
                tracing::warn!("Segment {:?} has an invalid header", path);
            }

            segments.push(Segment {
                timestamp,
                path,
                header,
            });
        }

        segments.sort_by_key(|s| s.timestamp);
        self.segments = segments;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// All segments, oldest first
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Sum of the record counts in every segment header
    pub fn total_count(&self) -> u64 {
        self.segments.iter().map(|s| s.header.count as u64).sum()
    }

    /// Number of decompressed bodies held in memory
    pub fn resident_count(&self) -> usize {
        self.loaded.len()
    }

    /// Write `records` as a new segment.
    ///
    /// The timestamp is bumped past the newest existing segment when needed
    /// so an existing file is never overwritten.
    pub async fn append_segment(&mut self, timestamp: i64, records: &RecordMap) -> Result<Segment> {
        let timestamp = match self.segments.last() {
            Some(last) if last.timestamp >= timestamp => last.timestamp + 1,
            _ => timestamp,
        };
        let count = u32::try_from(records.len())
            .map_err(|_| RecallError::Codec(format!("Too many records: {}", records.len())))?;

        let bytes = encode_segment(records)?;
        let path = self.dir.join(segment_filename(timestamp));
        let temp_path = path.with_extension("tmp");

        tokio::fs::write(&temp_path, &bytes).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        let segment = Segment {
            timestamp,
            path,
            header: SegmentHeader::new(count),
        };
        self.segments.push(segment.clone());

        tracing::info!(
            "Wrote segment {} with {} record(s)",
            segment_filename(timestamp),
            count
        );
        Ok(segment)
    }

    /// First segment created at or after `recall_ms`.
    ///
    /// Segments are flushed in time order, so a message recalled at T was
    /// promoted into whichever flush happened at or after T.
    pub fn find_candidate(&self, recall_ms: i64) -> Option<&Segment> {
        let found = self.segments.iter().find(|s| s.timestamp >= recall_ms);
        if found.is_none() {
            tracing::debug!("No segment created at or after {}", recall_ms);
        }
        found
    }

    /// Load and decompress a segment body, memoized by path.
    ///
    /// Missing files and corrupt bodies are logged and yield `None`.
    pub async fn load_body(&mut self, segment: &Segment) -> Option<Arc<RecordMap>> {
        if let Some(body) = self.loaded.peek(&segment.path) {
            tracing::debug!("Segment {:?} already resident", segment.path);
            return Some(Arc::clone(body));
        }

        let data = match tokio::fs::read(&segment.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Segment {:?} is not on disk", segment.path);
                return None;
            }
            Err(e) => {
                tracing::warn!("Failed to read segment {:?}: {}", segment.path, e);
                return None;
            }
        };

        let body = match decode_segment(&data) {
            Ok(records) => Arc::new(records),
            Err(e) => {
                tracing::warn!("Corrupt segment {:?}: {}", segment.path, e);
                return None;
            }
        };

        tracing::debug!(
            "Loaded segment {:?} ({} record(s))",
            segment.path,
            body.len()
        );
        if let Some((evicted, _)) = self.loaded.push(segment.path.clone(), Arc::clone(&body)) {
            tracing::debug!("Unloaded segment {:?}", evicted);
        }
        Some(body)
    }

    /// Look a message up in the segment chosen for `recall_ms`
    pub async fn lookup(&mut self, msg_id: &str, recall_ms: i64) -> Option<MessageRecord> {
        let candidate = self.find_candidate(recall_ms).cloned()?;
        let body = self.load_body(&candidate).await?;

        let found = body.get(msg_id).cloned();
        match &found {
            Some(_) => tracing::debug!("Found {} in segment {:?}", msg_id, candidate.path),
            None => tracing::debug!("{} not in segment {:?}", msg_id, candidate.path),
        }
        found
    }

    /// Search every segment for a message, newest first
    pub async fn find_anywhere(&mut self, msg_id: &str) -> Option<MessageRecord> {
        let segments: Vec<Segment> = self.segments.iter().rev().cloned().collect();
        for segment in segments {
            if let Some(body) = self.load_body(&segment).await {
                if let Some(record) = body.get(msg_id) {
                    return Some(record.clone());
                }
            }
        }
        None
    }

    /// Every readable persisted record, oldest segment first
    pub async fn all_records(&mut self) -> Vec<MessageRecord> {
        let segments = self.segments.clone();
        let mut records = Vec::new();

        for segment in segments {
            if let Some(body) = self.load_body(&segment).await {
                let mut batch: Vec<MessageRecord> = body.values().cloned().collect();
                batch.sort_by(|a, b| {
                    (a.send_time, &a.msg_id).cmp(&(b.send_time, &b.msg_id))
                });
                records.extend(batch);
            }
        }

        records
    }

    /// Delete every segment file and forget all loaded bodies
    pub async fn clear_all(&mut self) -> Result<()> {
        let mut first_error = None;

        for segment in self.segments.drain(..) {
            match tokio::fs::remove_file(&segment.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("Failed to delete segment {:?}: {}", segment.path, e);
                    first_error.get_or_insert(e);
                }
            }
        }
        self.loaded.clear();

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec::SEGMENT_HEADER_LEN;
    use crate::message::MessageElement;
    use tempfile::TempDir;

    fn record(id: &str, send_time: i64) -> MessageRecord {
        MessageRecord::new(id, "c1", "u1", send_time, vec![MessageElement::text(id)])
    }

    fn map(ids: &[&str]) -> RecordMap {
        ids.iter()
            .enumerate()
            .map(|(i, id)| (id.to_string(), record(id, i as i64)))
            .collect()
    }

    async fn create_test_store(max_resident: usize) -> (SegmentStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = SegmentStore::open(temp_dir.path().to_path_buf(), max_resident)
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_parse_segment_filename() {
        assert_eq!(parse_segment_filename("1700000000000.bin"), Some(1_700_000_000_000));
        assert_eq!(parse_segment_filename("abc.bin"), None);
        assert_eq!(parse_segment_filename("+12.bin"), None);
        assert_eq!(parse_segment_filename(".bin"), None);
        assert_eq!(parse_segment_filename("12.tmp"), None);
        assert_eq!(parse_segment_filename("active_recall.log"), None);
    }

    #[tokio::test]
    async fn test_open_empty_dir() {
        let (store, _temp_dir) = create_test_store(2).await;
        assert!(store.segments().is_empty());
        assert_eq!(store.total_count(), 0);
    }

    #[tokio::test]
    async fn test_open_creates_missing_dir() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("nested").join("store");
        let store = SegmentStore::open(dir.clone(), 2).await.unwrap();
        assert!(dir.exists());
        assert!(store.segments().is_empty());
    }

    #[tokio::test]
    async fn test_append_and_reopen_sorted() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        {
            let mut store = SegmentStore::open(dir.clone(), 2).await.unwrap();
            store.append_segment(300, &map(&["c"])).await.unwrap();
        }
        // Older files written out of band still sort first
        std::fs::write(dir.join("100.bin"), encode_segment(&map(&["a", "b"])).unwrap()).unwrap();

        let store = SegmentStore::open(dir, 2).await.unwrap();
        let timestamps: Vec<_> = store.segments().iter().map(|s| s.timestamp).collect();
        assert_eq!(timestamps, vec![100, 300]);
        assert_eq!(store.total_count(), 3);
    }

    #[tokio::test]
    async fn test_invalid_header_still_listed() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_path_buf();
        std::fs::write(dir.join("100.bin"), b"not a segment at all").unwrap();
        std::fs::write(dir.join("notes.txt"), b"ignored").unwrap();

        let store = SegmentStore::open(dir.clone(), 2).await.unwrap();
        assert_eq!(store.segments().len(), 1);
        assert!(!store.segments()[0].header.is_valid());
        assert_eq!(store.total_count(), 0);

        // Scanning again yields the same index
        let again = SegmentStore::open(dir, 2).await.unwrap();
        assert_eq!(again.segments(), store.segments());
    }

    #[tokio::test]
    async fn test_append_never_overwrites() {
        let (mut store, _temp_dir) = create_test_store(2).await;
        let first = store.append_segment(500, &map(&["a"])).await.unwrap();
        let second = store.append_segment(500, &map(&["b"])).await.unwrap();
        let third = store.append_segment(400, &map(&["c"])).await.unwrap();

        assert_eq!(first.timestamp, 500);
        assert_eq!(second.timestamp, 501);
        assert_eq!(third.timestamp, 502);
        assert!(first.path.exists() && second.path.exists() && third.path.exists());
    }

    #[tokio::test]
    async fn test_find_candidate_forward_scan() {
        let (mut store, _temp_dir) = create_test_store(2).await;
        for ts in [100, 200, 300] {
            store.append_segment(ts, &map(&["x"])).await.unwrap();
        }

        assert_eq!(store.find_candidate(150).unwrap().timestamp, 200);
        assert_eq!(store.find_candidate(200).unwrap().timestamp, 200);
        assert_eq!(store.find_candidate(50).unwrap().timestamp, 100);
        assert!(store.find_candidate(350).is_none());
    }

    #[tokio::test]
    async fn test_lookup_hit_and_miss() {
        let (mut store, _temp_dir) = create_test_store(2).await;
        store.append_segment(100, &map(&["a"])).await.unwrap();
        store.append_segment(200, &map(&["b"])).await.unwrap();

        assert_eq!(store.lookup("b", 150).await.unwrap().msg_id, "b");
        // "a" lives in an earlier segment than the candidate
        assert!(store.lookup("a", 150).await.is_none());
        assert!(store.lookup("b", 250).await.is_none());
    }

    #[tokio::test]
    async fn test_resident_bodies_bounded_by_load_order() {
        let (mut store, _temp_dir) = create_test_store(2).await;
        let s1 = store.append_segment(100, &map(&["a"])).await.unwrap();
        let s2 = store.append_segment(200, &map(&["b"])).await.unwrap();
        let s3 = store.append_segment(300, &map(&["c"])).await.unwrap();

        store.load_body(&s1).await.unwrap();
        store.load_body(&s2).await.unwrap();
        // A repeat load does not refresh s1
        store.load_body(&s1).await.unwrap();
        store.load_body(&s3).await.unwrap();

        assert_eq!(store.resident_count(), 2);
        assert!(!store.loaded.contains(&s1.path));
        assert!(store.loaded.contains(&s2.path));
        assert!(store.loaded.contains(&s3.path));
    }

    #[tokio::test]
    async fn test_corrupt_body_is_miss() {
        let (mut store, _temp_dir) = create_test_store(2).await;
        let segment = store.append_segment(100, &map(&["a"])).await.unwrap();

        let mut bytes = std::fs::read(&segment.path).unwrap();
        bytes.truncate(SEGMENT_HEADER_LEN + 2);
        std::fs::write(&segment.path, bytes).unwrap();

        assert!(store.load_body(&segment).await.is_none());
        assert!(store.lookup("a", 50).await.is_none());
        assert_eq!(store.resident_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_miss() {
        let (mut store, _temp_dir) = create_test_store(2).await;
        let segment = store.append_segment(100, &map(&["a"])).await.unwrap();
        std::fs::remove_file(&segment.path).unwrap();

        assert!(store.load_body(&segment).await.is_none());
    }

    #[tokio::test]
    async fn test_find_anywhere_and_all_records() {
        let (mut store, _temp_dir) = create_test_store(1).await;
        store.append_segment(100, &map(&["a", "b"])).await.unwrap();
        store.append_segment(200, &map(&["c"])).await.unwrap();

        assert_eq!(store.find_anywhere("a").await.unwrap().msg_id, "a");
        assert!(store.find_anywhere("zzz").await.is_none());

        let ids: Vec<_> = store
            .all_records()
            .await
            .into_iter()
            .map(|r| r.msg_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let (mut store, temp_dir) = create_test_store(2).await;
        let segment = store.append_segment(100, &map(&["a"])).await.unwrap();
        store.load_body(&segment).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.segments().is_empty());
        assert_eq!(store.resident_count(), 0);
        assert!(!segment.path.exists());
        assert!(temp_dir.path().exists());
    }
}
