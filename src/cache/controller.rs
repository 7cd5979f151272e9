// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Recall controller
//!
//! Owns every cache tier and drives them from the host's message stream.
//! Ordinary messages feed the hot ring; recall notices are matched against
//! the tiers and replaced by the reconstructed message.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::active::ActiveBuffer;
use super::ring::RingBuffer;
use super::scratch::ScratchMirror;
use super::segment::SegmentStore;
use super::RecallLimits;
use crate::config::Settings;
use crate::error::Result;
use crate::message::{ChatType, MessageRecord, RecallTombstone, StreamElement};
use crate::rehydrate::{HttpImageFetcher, ImageRehydrator, REDIRECT_DIR_NAME};

/// Receives notifications about reconstructed messages
pub trait RecallListener: Send + Sync {
    /// Called once per batch that reconstructed at least one message
    fn on_reconstructed(&self, msg_ids: &[String]);

    /// Called when a batch changed the number of recalled messages held
    fn on_cache_size_changed(&self, _size: u64) {}
}

/// Result of processing one batch
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// The batch with matched recall notices replaced by their message
    pub elements: Vec<StreamElement>,
    /// Ids of reconstructed messages, in batch order
    pub reconstructed: Vec<String>,
}

/// Per-conversation summary of recalled messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatSummary {
    pub chat_id: String,
    pub chat_type: ChatType,
    pub peer_name: Option<String>,
    /// Send time of the newest recalled message, epoch seconds
    pub latest_send_time: i64,
    pub message_count: usize,
}

pub struct RecallController {
    store_dir: PathBuf,
    limits: RecallLimits,
    ring: RingBuffer,
    active: ActiveBuffer,
    scratch: ScratchMirror,
    segments: SegmentStore,
    rehydrator: ImageRehydrator,
    listener: Option<Arc<dyn RecallListener>>,
    downloads: Vec<JoinHandle<()>>,
}

impl RecallController {
    /// Open the cache rooted at `store_dir`, rebuilding the active tier
    /// from the scratch mirror
    pub async fn open(
        store_dir: PathBuf,
        limits: RecallLimits,
        rehydrator: ImageRehydrator,
    ) -> Result<Self> {
        let segments = SegmentStore::open(store_dir.clone(), limits.max_resident_segments).await?;
        let scratch = ScratchMirror::open(&store_dir).await?;

        let mut active = ActiveBuffer::new(limits.flush_threshold);
        let replay = scratch.replay().await?;
        if let Some(stop) = &replay.stopped {
            tracing::warn!("Scratch replay ended early: {:?}", stop);
        }
        for record in replay.records {
            active.promote(record);
        }

        let mut controller = Self {
            store_dir,
            ring: RingBuffer::new(limits.ring_capacity),
            active,
            scratch,
            segments,
            rehydrator,
            listener: None,
            downloads: Vec::new(),
            limits,
        };

        // The threshold may have been lowered since the mirror was written
        if controller.limits.persist_to_disk && controller.active.is_full() {
            controller.flush().await?;
        }

        tracing::info!(
            "Recall cache ready in {}: {} active, {} segment(s), {} persisted",
            controller.store_dir.display(),
            controller.active.len(),
            controller.segments.segments().len(),
            controller.segments.total_count()
        );
        Ok(controller)
    }

    /// Open the cache for `uid` as described by `settings`
    pub async fn from_settings(settings: &Settings, uid: &str) -> Result<Self> {
        let store_dir = settings.user_store_dir(uid);
        let fetcher = HttpImageFetcher::new(
            settings.image.rkey_server_url.clone(),
            Duration::from_secs(settings.image.request_timeout_secs),
        )?;
        let rehydrator = ImageRehydrator::new(
            Arc::new(fetcher),
            store_dir.join(REDIRECT_DIR_NAME),
            settings.recall.redirect_pictures,
        );
        Self::open(store_dir, RecallLimits::from(&settings.recall), rehydrator).await
    }

    pub fn set_listener(&mut self, listener: Arc<dyn RecallListener>) {
        self.listener = Some(listener);
    }

    pub fn store_dir(&self) -> &Path {
        &self.store_dir
    }

    pub fn limits(&self) -> &RecallLimits {
        &self.limits
    }

    /// Messages currently held in the hot ring
    pub fn hot_len(&self) -> usize {
        self.ring.len()
    }

    /// Recalled messages not yet flushed into a segment
    pub fn active_len(&self) -> usize {
        self.active.len()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.segments().len()
    }

    /// Process one batch from the host
    pub async fn process_batch(&mut self, batch: Vec<StreamElement>) -> BatchOutcome {
        if !self.limits.enabled {
            return BatchOutcome {
                elements: batch,
                reconstructed: Vec::new(),
            };
        }

        let size_before = self.cache_size();
        let mut outcome = BatchOutcome {
            elements: Vec::with_capacity(batch.len()),
            reconstructed: Vec::new(),
        };

        for element in batch {
            match element {
                StreamElement::Message(record) => {
                    if record.is_complete() {
                        self.ring.push(record.clone());
                    }
                    outcome.elements.push(StreamElement::Message(record));
                }
                StreamElement::Recall(tombstone) => match self.reconstruct(&tombstone).await {
                    Some(record) => {
                        outcome.reconstructed.push(record.msg_id.clone());
                        outcome.elements.push(StreamElement::Message(record));
                    }
                    None => outcome.elements.push(StreamElement::Recall(tombstone)),
                },
            }
        }

        if let Some(listener) = &self.listener {
            if !outcome.reconstructed.is_empty() {
                listener.on_reconstructed(&outcome.reconstructed);
            }
            let size_after = self.cache_size();
            if size_after != size_before {
                listener.on_cache_size_changed(size_after);
            }
        }

        outcome
    }

    /// Find the original content for a recall notice
    async fn reconstruct(&mut self, tombstone: &RecallTombstone) -> Option<MessageRecord> {
        let msg_id = tombstone.msg_id.as_str();

        if tombstone.is_self_operate && !self.limits.intercept_self_recall {
            tracing::debug!("Ignoring self recall of {}", msg_id);
            return None;
        }

        // Already recalled: a re-delivered original must not annotate it again
        if let Some(record) = self.active.get(msg_id).cloned() {
            tracing::debug!("Active hit for {}", msg_id);
            self.ring.remove(msg_id);
            return Some(record);
        }

        if self.ring.contains(msg_id) {
            if let Some(stored) = self
                .segments
                .lookup(msg_id, tombstone.recall_time_ms())
                .await
            {
                tracing::debug!("Persisted hit for re-delivered {}", msg_id);
                self.ring.remove(msg_id);
                return Some(stored);
            }
        }

        if let Some(record) = self.ring.remove(msg_id) {
            tracing::debug!("Hot hit for {}", msg_id);
            let (record, downloads) = self.rehydrator.rehydrate(record.annotated(tombstone));
            self.track_downloads(downloads);
            if let Err(e) = self.promote(&record).await {
                tracing::warn!("Failed to persist recalled message {}: {}", msg_id, e);
            }
            return Some(record);
        }

        let found = self
            .segments
            .lookup(msg_id, tombstone.recall_time_ms())
            .await;
        match &found {
            Some(_) => tracing::debug!("Persisted hit for {}", msg_id),
            None => tracing::debug!("No stored content for recalled message {}", msg_id),
        }
        found
    }

    /// Move a reconstructed record into the active tier
    async fn promote(&mut self, record: &MessageRecord) -> Result<()> {
        self.active.promote(record.clone());
        if !self.limits.persist_to_disk {
            return Ok(());
        }

        // Once a segment holds the record the scratch must not see it again
        if self.active.is_full() && self.flush().await? {
            return Ok(());
        }

        self.scratch.append(record).await
    }

    /// Write the active tier out as a new segment.
    ///
    /// Returns `Ok(false)` when the segment could not be written; the records
    /// are back in the active tier and the scratch is untouched. An error means
    /// the segment exists but the scratch could not be truncated.
    async fn flush(&mut self) -> Result<bool> {
        let records = self.active.drain();
        let timestamp = chrono::Utc::now().timestamp_millis();

        match self.segments.append_segment(timestamp, &records).await {
            Ok(segment) => {
                tracing::info!(
                    "Flushed {} recalled message(s) to {:?}",
                    records.len(),
                    segment.path
                );
                if let Err(e) = self.scratch.truncate().await {
                    tracing::error!(
                        "Segment {:?} written but scratch not truncated: {}",
                        segment.path,
                        e
                    );
                    return Err(e);
                }
                Ok(true)
            }
            Err(e) => {
                tracing::warn!("Flush failed, keeping active buffer: {}", e);
                for record in records.into_values() {
                    self.active.promote(record);
                }
                Ok(false)
            }
        }
    }

    fn track_downloads(&mut self, handles: Vec<JoinHandle<()>>) {
        self.downloads.retain(|handle| !handle.is_finished());
        self.downloads.extend(handles);
    }

    /// Number of recalled messages held in the active and persisted tiers
    pub fn cache_size(&self) -> u64 {
        self.active.len() as u64 + self.segments.total_count()
    }

    /// Every recalled message, active tier first
    async fn all_recalled(&mut self) -> Vec<MessageRecord> {
        let mut seen = HashSet::new();
        let mut records: Vec<MessageRecord> = self
            .active
            .values()
            .inspect(|r| {
                seen.insert(r.msg_id.clone());
            })
            .cloned()
            .collect();

        for record in self.segments.all_records().await {
            if seen.insert(record.msg_id.clone()) {
                records.push(record);
            }
        }
        records
    }

    /// Recalled messages of one conversation, oldest first
    pub async fn list_by_chat(&mut self, chat_id: &str) -> Vec<MessageRecord> {
        let mut records: Vec<MessageRecord> = self
            .all_recalled()
            .await
            .into_iter()
            .filter(|r| r.chat_id == chat_id)
            .collect();
        records.sort_by_key(|r| r.send_time);
        records
    }

    /// The stored original of a recalled message, searching every segment
    pub async fn original_by_id(&mut self, msg_id: &str) -> Option<MessageRecord> {
        if let Some(record) = self.active.get(msg_id) {
            return Some(record.clone());
        }
        self.segments.find_anywhere(msg_id).await
    }

    /// Conversations with recalled messages, most recent first
    pub async fn recalled_chats(&mut self) -> Vec<ChatSummary> {
        let mut chats: HashMap<String, ChatSummary> = HashMap::new();

        for record in self.all_recalled().await {
            let summary = chats
                .entry(record.chat_id.clone())
                .or_insert_with(|| ChatSummary {
                    chat_id: record.chat_id.clone(),
                    chat_type: record.chat_type,
                    peer_name: None,
                    latest_send_time: record.send_time,
                    message_count: 0,
                });

            summary.message_count += 1;
            if record.send_time >= summary.latest_send_time {
                summary.latest_send_time = record.send_time;
            }
            if record.peer_name.is_some() {
                summary.peer_name = record.peer_name.clone();
            }
        }

        let mut chats: Vec<ChatSummary> = chats.into_values().collect();
        chats.sort_by(|a, b| {
            b.latest_send_time
                .cmp(&a.latest_send_time)
                .then_with(|| a.chat_id.cmp(&b.chat_id))
        });
        chats
    }

    /// Delete every recalled message from memory and disk
    pub async fn clear_all(&mut self) -> Result<()> {
        let size_before = self.cache_size();

        self.active.clear();
        self.segments.clear_all().await?;
        self.scratch.truncate().await?;

        tracing::info!("Cleared {} recalled message(s)", size_before);
        if size_before != 0 {
            if let Some(listener) = &self.listener {
                listener.on_cache_size_changed(0);
            }
        }
        Ok(())
    }

    /// Drop in-memory state without flushing. The scratch mirror is left
    /// on disk so the next open picks the active tier back up.
    pub fn shutdown(&mut self) {
        tracing::debug!(
            "Shutting down recall cache ({} hot, {} active)",
            self.ring.len(),
            self.active.len()
        );
        self.ring.clear();
        self.active.clear();
    }

    /// Wait for every picture download started so far
    pub async fn wait_for_downloads(&mut self) {
        for handle in std::mem::take(&mut self.downloads) {
            if let Err(e) = handle.await {
                tracing::warn!("Picture download task failed: {}", e);
            }
        }
    }
}
