// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Hot ring buffer of recently observed messages
//!
//! Keeps the last N messages whether or not they will ever be recalled.
//! Eviction follows insertion order: looking a message up, or seeing the
//! same id again, does not make it any younger.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::message::MessageRecord;

/// Bounded, insertion-ordered map of recent messages
pub struct RingBuffer {
    entries: LruCache<String, MessageRecord>,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Insert a message, evicting the oldest entry when full.
    ///
    /// Incomplete messages (no elements) are ignored. Returns the evicted
    /// message, if any.
    pub fn push(&mut self, record: MessageRecord) -> Option<MessageRecord> {
        if !record.is_complete() {
            return None;
        }

        // Updating in place keeps the original insertion slot
        if let Some(existing) = self.entries.peek_mut(&record.msg_id) {
            *existing = record;
            return None;
        }

        self.entries
            .push(record.msg_id.clone(), record)
            .map(|(_, evicted)| evicted)
    }

    pub fn get(&self, msg_id: &str) -> Option<&MessageRecord> {
        self.entries.peek(msg_id)
    }

    pub fn contains(&self, msg_id: &str) -> bool {
        self.entries.contains(msg_id)
    }

    pub fn remove(&mut self, msg_id: &str) -> Option<MessageRecord> {
        self.entries.pop(msg_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Message ids from oldest to newest
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().rev().map(|(id, _)| id.clone()).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
