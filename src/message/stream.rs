// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Stream elements delivered by the host
//!
//! The host does not distinguish tombstones from messages: a recall arrives
//! as a message whose only element is a revoke gray tip. [`HostMessage::classify`]
//! makes that distinction explicit.

use serde::{Deserialize, Serialize};

use super::element::RevokeElement;
use super::record::MessageRecord;

/// Notification that a message was recalled. Never stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecallTombstone {
    pub msg_id: String,
    /// Recall time, epoch seconds
    pub recall_time: i64,
    pub is_self_operate: bool,
    #[serde(default)]
    pub operator_nick: String,
    #[serde(default)]
    pub operator_remark: String,
    #[serde(default)]
    pub operator_mem_remark: String,
    #[serde(default)]
    pub orig_msg_sender_nick: String,
    #[serde(default)]
    pub orig_msg_sender_remark: String,
    #[serde(default)]
    pub orig_msg_sender_mem_remark: String,
}

impl RecallTombstone {
    pub fn new(msg_id: impl Into<String>, recall_time: i64) -> Self {
        Self {
            msg_id: msg_id.into(),
            recall_time,
            ..Default::default()
        }
    }

    pub fn with_operator(mut self, nick: impl Into<String>) -> Self {
        self.operator_nick = nick.into();
        self
    }

    pub fn self_operated(mut self) -> Self {
        self.is_self_operate = true;
        self
    }

    /// Recall time in epoch milliseconds, the unit segment names use
    pub fn recall_time_ms(&self) -> i64 {
        self.recall_time.saturating_mul(1000)
    }

    fn from_revoke(msg_id: String, recall_time: i64, revoke: &RevokeElement) -> Self {
        Self {
            msg_id,
            recall_time,
            is_self_operate: revoke.is_self_operate,
            operator_nick: revoke.operator_nick.clone(),
            operator_remark: revoke.operator_remark.clone(),
            operator_mem_remark: revoke.operator_mem_remark.clone(),
            orig_msg_sender_nick: revoke.orig_msg_sender_nick.clone(),
            orig_msg_sender_remark: revoke.orig_msg_sender_remark.clone(),
            orig_msg_sender_mem_remark: revoke.orig_msg_sender_mem_remark.clone(),
        }
    }
}

/// One element of a host batch, after classification
#[derive(Debug, Clone, PartialEq)]
pub enum StreamElement {
    Message(MessageRecord),
    Recall(RecallTombstone),
}

impl StreamElement {
    pub fn msg_id(&self) -> &str {
        match self {
            Self::Message(record) => &record.msg_id,
            Self::Recall(tombstone) => &tombstone.msg_id,
        }
    }
}

impl From<MessageRecord> for StreamElement {
    fn from(record: MessageRecord) -> Self {
        Self::Message(record)
    }
}

impl From<RecallTombstone> for StreamElement {
    fn from(tombstone: RecallTombstone) -> Self {
        Self::Recall(tombstone)
    }
}

/// A message exactly as the host delivers it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    #[serde(flatten)]
    pub record: MessageRecord,
    /// Set by the host on recall notices, epoch seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recall_time: Option<i64>,
}

impl HostMessage {
    /// Turn the host message into a tombstone or an ordinary message
    pub fn classify(self) -> StreamElement {
        let revoke = match self.record.elements.as_slice() {
            [only] => only.as_revoke().cloned(),
            _ => None,
        };

        match revoke {
            Some(revoke) => {
                let recall_time = self.recall_time.unwrap_or(self.record.send_time);
                StreamElement::Recall(RecallTombstone::from_revoke(
                    self.record.msg_id,
                    recall_time,
                    &revoke,
                ))
            }
            None => StreamElement::Message(self.record),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageElement;

    fn revoke_message(msg_id: &str) -> HostMessage {
        HostMessage {
            record: MessageRecord::new(
                msg_id,
                "c1",
                "u1",
                100,
                vec![MessageElement::Revoke(RevokeElement {
                    is_self_operate: true,
                    operator_nick: "Bob".to_string(),
                    ..Default::default()
                })],
            ),
            recall_time: Some(200),
        }
    }

    #[test]
    fn test_classify_revoke_as_tombstone() {
        match revoke_message("m1").classify() {
            StreamElement::Recall(t) => {
                assert_eq!(t.msg_id, "m1");
                assert_eq!(t.recall_time, 200);
                assert!(t.is_self_operate);
                assert_eq!(t.operator_nick, "Bob");
            }
            other => panic!("expected tombstone, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_missing_recall_time_uses_send_time() {
        let mut host = revoke_message("m1");
        host.recall_time = None;
        match host.classify() {
            StreamElement::Recall(t) => assert_eq!(t.recall_time, 100),
            other => panic!("expected tombstone, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_ordinary_message() {
        let host = HostMessage {
            record: MessageRecord::new("m2", "c1", "u1", 100, vec![MessageElement::text("hi")]),
            recall_time: None,
        };
        assert!(matches!(host.classify(), StreamElement::Message(_)));
    }

    #[test]
    fn test_classify_revoke_with_other_elements_is_message() {
        let mut host = revoke_message("m3");
        host.record.elements.push(MessageElement::text("extra"));
        assert!(matches!(host.classify(), StreamElement::Message(_)));
    }

    #[test]
    fn test_host_message_json_is_flat() {
        let json = r#"{
            "msg_id": "m9",
            "chat_id": "c1",
            "sender_id": "u1",
            "send_time": 5,
            "elements": [{"kind": "text", "content": "yo"}]
        }"#;
        let host: HostMessage = serde_json::from_str(json).unwrap();
        assert_eq!(host.record.msg_id, "m9");
        assert!(host.recall_time.is_none());
    }

    #[test]
    fn test_recall_time_ms() {
        assert_eq!(RecallTombstone::new("m", 150).recall_time_ms(), 150_000);
    }
}
