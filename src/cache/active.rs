// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Active recall buffer
//!
//! Holds messages confirmed as recalled since the last flush. It is the
//! first place a repeated tombstone is looked up, ahead of any segment.

use std::collections::HashMap;

use super::codec::RecordMap;
use crate::message::MessageRecord;

/// Recalled messages not yet flushed into a segment
#[derive(Debug, Default)]
pub struct ActiveBuffer {
    records: HashMap<String, MessageRecord>,
    /// Promotion order
    order: Vec<String>,
    flush_threshold: usize,
}

impl ActiveBuffer {
    pub fn new(flush_threshold: usize) -> Self {
        Self {
            records: HashMap::new(),
            order: Vec::new(),
            flush_threshold: flush_threshold.max(1),
        }
    }

    /// Add a reconstructed message
    pub fn promote(&mut self, record: MessageRecord) {
        if !self.records.contains_key(&record.msg_id) {
            self.order.push(record.msg_id.clone());
        }
        self.records.insert(record.msg_id.clone(), record);
    }

    pub fn get(&self, msg_id: &str) -> Option<&MessageRecord> {
        self.records.get(msg_id)
    }

    pub fn contains(&self, msg_id: &str) -> bool {
        self.records.contains_key(msg_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn flush_threshold(&self) -> usize {
        self.flush_threshold
    }

    /// Whether the buffer has reached its flush threshold
    pub fn is_full(&self) -> bool {
        self.records.len() >= self.flush_threshold
    }

    /// Records in promotion order
    pub fn values(&self) -> impl Iterator<Item = &MessageRecord> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Take every record out of the buffer, leaving it empty
    pub fn drain(&mut self) -> RecordMap {
        self.order.clear();
        std::mem::take(&mut self.records)
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageElement;

    fn record(id: &str) -> MessageRecord {
        MessageRecord::new(id, "c1", "u1", 10, vec![MessageElement::text(id)])
    }

    #[test]
    fn test_promote_and_get() {
        let mut active = ActiveBuffer::new(10);
        active.promote(record("a"));
        assert!(active.contains("a"));
        assert_eq!(active.get("a").unwrap().msg_id, "a");
        assert!(active.get("b").is_none());
    }

    #[test]
    fn test_is_full_at_threshold() {
        let mut active = ActiveBuffer::new(2);
        active.promote(record("a"));
        assert!(!active.is_full());
        active.promote(record("b"));
        assert!(active.is_full());
    }

    #[test]
    fn test_repromote_does_not_grow() {
        let mut active = ActiveBuffer::new(5);
        active.promote(record("a"));
        active.promote(record("a"));
        assert_eq!(active.len(), 1);
        assert_eq!(active.values().count(), 1);
    }

    #[test]
    fn test_values_in_promotion_order() {
        let mut active = ActiveBuffer::new(5);
        for id in ["c", "a", "b"] {
            active.promote(record(id));
        }
        let ids: Vec<_> = active.values().map(|r| r.msg_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_drain_empties() {
        let mut active = ActiveBuffer::new(5);
        active.promote(record("a"));
        active.promote(record("b"));

        let drained = active.drain();
        assert_eq!(drained.len(), 2);
        assert!(drained.contains_key("b"));
        assert!(active.is_empty());
        assert_eq!(active.values().count(), 0);
    }
}
