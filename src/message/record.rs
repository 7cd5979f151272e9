// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message records and recall annotations

use serde::{Deserialize, Serialize};

use super::element::MessageElement;
use super::stream::RecallTombstone;

/// Kind of conversation a message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    #[default]
    Friend,
    Group,
    TempSession,
}

/// A chat message as observed on the stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message identifier
    pub msg_id: String,
    /// Peer uid of the conversation
    pub chat_id: String,
    #[serde(default)]
    pub chat_type: ChatType,
    /// Display name of the conversation (groups only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_name: Option<String>,
    pub sender_id: String,
    /// Send time, epoch seconds
    pub send_time: i64,
    pub elements: Vec<MessageElement>,
    /// Present once the message has been reconstructed after a recall
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall: Option<RecallAnnotation>,
}

impl MessageRecord {
    /// Create a record with no recall annotation
    pub fn new(
        msg_id: impl Into<String>,
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        send_time: i64,
        elements: Vec<MessageElement>,
    ) -> Self {
        Self {
            msg_id: msg_id.into(),
            chat_id: chat_id.into(),
            chat_type: ChatType::Friend,
            peer_name: None,
            sender_id: sender_id.into(),
            send_time,
            elements,
            recall: None,
        }
    }

    /// Whether the host has finished materializing this message
    pub fn is_complete(&self) -> bool {
        !self.elements.is_empty()
    }

    pub fn has_pictures(&self) -> bool {
        self.elements.iter().any(|e| e.as_picture().is_some())
    }

    /// Text content with non-text elements in brackets
    pub fn summary(&self) -> String {
        self.elements
            .iter()
            .map(MessageElement::summary)
            .collect::<Vec<_>>()
            .join("")
    }

    /// Consume the record and return it annotated with the tombstone's recall data
    pub fn annotated(mut self, tombstone: &RecallTombstone) -> Self {
        self.recall = Some(RecallAnnotation::from_tombstone(tombstone));
        self
    }
}

/// Who recalled a message and when
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallAnnotation {
    pub operator_nick: String,
    pub operator_remark: String,
    pub operator_mem_remark: String,
    pub orig_msg_sender_nick: String,
    pub orig_msg_sender_remark: String,
    pub orig_msg_sender_mem_remark: String,
    /// Recall time, epoch seconds
    pub recall_time: i64,
}

impl RecallAnnotation {
    pub fn from_tombstone(tombstone: &RecallTombstone) -> Self {
        Self {
            operator_nick: tombstone.operator_nick.clone(),
            operator_remark: tombstone.operator_remark.clone(),
            operator_mem_remark: tombstone.operator_mem_remark.clone(),
            orig_msg_sender_nick: tombstone.orig_msg_sender_nick.clone(),
            orig_msg_sender_remark: tombstone.orig_msg_sender_remark.clone(),
            orig_msg_sender_mem_remark: tombstone.orig_msg_sender_mem_remark.clone(),
            recall_time: tombstone.recall_time,
        }
    }
}
