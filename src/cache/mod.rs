// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Recall reconstruction cache
//!
//! Three tiers, consulted in order when a recall notice arrives:
//!
//! - Hot (ring): the last N messages seen on the stream, in memory only
//! - Active: messages already reconstructed, mirrored to a scratch log
//! - Persisted: immutable compressed segments flushed from the active tier
//!
//! A hit in the hot tier is reconstructed once and promoted; later notices
//! for the same message are answered from the active or persisted tier.

pub mod active;
pub mod codec;
pub mod controller;
pub mod ring;
pub mod scratch;
pub mod segment;

pub use active::ActiveBuffer;
pub use codec::{RecordMap, SegmentHeader};
pub use controller::{BatchOutcome, ChatSummary, RecallController, RecallListener};
pub use ring::RingBuffer;
pub use scratch::{ScratchMirror, SCRATCH_FILE_NAME};
pub use segment::{Segment, SegmentStore};

use crate::config::RecallSettings;

/// Sizing and policy for the cache tiers
#[derive(Debug, Clone)]
pub struct RecallLimits {
    /// Whether tombstones are reconstructed at all
    pub enabled: bool,
    /// Messages kept in the hot ring
    pub ring_capacity: usize,
    /// Active buffer size that triggers a flush into a new segment
    pub flush_threshold: usize,
    /// Decompressed segment bodies kept in memory
    pub max_resident_segments: usize,
    /// Write the scratch mirror and segments; memory only when false
    pub persist_to_disk: bool,
    /// Reconstruct messages the current user recalled
    pub intercept_self_recall: bool,
}

impl Default for RecallLimits {
    fn default() -> Self {
        Self {
            enabled: true,
            ring_capacity: 200,
            flush_threshold: 500,
            max_resident_segments: 5,
            persist_to_disk: true,
            intercept_self_recall: false,
        }
    }
}

impl From<&RecallSettings> for RecallLimits {
    fn from(settings: &RecallSettings) -> Self {
        Self {
            enabled: settings.enabled,
            ring_capacity: settings.ring_capacity,
            flush_threshold: settings.flush_threshold,
            max_resident_segments: settings.max_resident_segments,
            persist_to_disk: settings.persist_to_disk,
            intercept_self_recall: settings.intercept_self_recall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_from_settings() {
        let settings = RecallSettings {
            ring_capacity: 7,
            intercept_self_recall: true,
            ..Default::default()
        };
        let limits = RecallLimits::from(&settings);
        assert_eq!(limits.ring_capacity, 7);
        assert!(limits.intercept_self_recall);
        assert_eq!(limits.flush_threshold, settings.flush_threshold);
    }

    #[test]
    fn test_default_limits_match_default_settings() {
        let from_settings = RecallLimits::from(&RecallSettings::default());
        let defaults = RecallLimits::default();
        assert_eq!(from_settings.ring_capacity, defaults.ring_capacity);
        assert_eq!(from_settings.flush_threshold, defaults.flush_threshold);
        assert_eq!(
            from_settings.max_resident_segments,
            defaults.max_resident_segments
        );
        assert_eq!(from_settings.persist_to_disk, defaults.persist_to_disk);
    }
}
