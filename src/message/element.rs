// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Typed message content elements
//!
//! The host describes content as a list of loosely shaped elements. We keep a
//! closed set of kinds with a typed payload each; anything we do not model is
//! carried as [`MessageElement::Opaque`] so it survives a trip through disk.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Host element type codes
pub mod element_type {
    pub const TEXT: u32 = 1;
    pub const PICTURE: u32 = 2;
    pub const FILE: u32 = 3;
    pub const VOICE: u32 = 4;
    pub const VIDEO: u32 = 5;
    pub const FACE: u32 = 6;
    pub const REPLY: u32 = 7;
    pub const GRAY_TIP: u32 = 8;
    pub const ARK: u32 = 10;
    pub const MARKET_FACE: u32 = 11;
    pub const MULTI_FORWARD: u32 = 16;
}

/// A single content element of a message
///
/// Deserializing never fails on an unknown or malformed element: it becomes
/// [`MessageElement::Opaque`] holding the element's JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", from = "serde_json::Value")]
pub enum MessageElement {
    Text(TextElement),
    Picture(PictureElement),
    File(FileElement),
    Voice(MediaElement),
    Video(MediaElement),
    Face(FaceElement),
    Reply(ReplyElement),
    GrayTip(GrayTipElement),
    /// Gray tip announcing that a message was recalled
    Revoke(RevokeElement),
    Ark(ArkElement),
    MarketFace(MarketFaceElement),
    MultiForward(MultiForwardElement),
    /// Element kind we do not understand, kept byte for byte
    Opaque { element_type: u32, raw: Vec<u8> },
}

/// The kinds we model, as they appear on the wire
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum KnownElement {
    Text(TextElement),
    Picture(PictureElement),
    File(FileElement),
    Voice(MediaElement),
    Video(MediaElement),
    Face(FaceElement),
    Reply(ReplyElement),
    GrayTip(GrayTipElement),
    Revoke(RevokeElement),
    Ark(ArkElement),
    MarketFace(MarketFaceElement),
    MultiForward(MultiForwardElement),
    Opaque { element_type: u32, raw: Vec<u8> },
}

impl From<KnownElement> for MessageElement {
    fn from(known: KnownElement) -> Self {
        match known {
            KnownElement::Text(el) => Self::Text(el),
            KnownElement::Picture(el) => Self::Picture(el),
            KnownElement::File(el) => Self::File(el),
            KnownElement::Voice(el) => Self::Voice(el),
            KnownElement::Video(el) => Self::Video(el),
            KnownElement::Face(el) => Self::Face(el),
            KnownElement::Reply(el) => Self::Reply(el),
            KnownElement::GrayTip(el) => Self::GrayTip(el),
            KnownElement::Revoke(el) => Self::Revoke(el),
            KnownElement::Ark(el) => Self::Ark(el),
            KnownElement::MarketFace(el) => Self::MarketFace(el),
            KnownElement::MultiForward(el) => Self::MultiForward(el),
            KnownElement::Opaque { element_type, raw } => Self::Opaque { element_type, raw },
        }
    }
}

impl From<serde_json::Value> for MessageElement {
    fn from(value: serde_json::Value) -> Self {
        match KnownElement::deserialize(&value) {
            Ok(known) => known.into(),
            Err(e) => {
                tracing::debug!("Keeping unrecognized element as opaque: {}", e);
                let element_type = value
                    .get("element_type")
                    .and_then(serde_json::Value::as_u64)
                    .and_then(|t| u32::try_from(t).ok())
                    .unwrap_or(0);
                Self::Opaque {
                    element_type,
                    raw: serde_json::to_vec(&value).unwrap_or_default(),
                }
            }
        }
    }
}

impl MessageElement {
    /// Create a plain text element
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(TextElement {
            content: content.into(),
            at_uid: None,
        })
    }

    /// Create a picture element with no thumbnails
    pub fn picture(md5_hex: impl Into<String>, source_path: impl Into<String>) -> Self {
        let source_path = source_path.into();
        let file_name = std::path::Path::new(&source_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::Picture(PictureElement {
            md5_hex: md5_hex.into(),
            file_name,
            source_path,
            thumb_paths: BTreeMap::new(),
            origin_image_url: None,
            width: 0,
            height: 0,
        })
    }

    /// The host's numeric code for this element kind
    pub fn element_type(&self) -> u32 {
        match self {
            Self::Text(_) => element_type::TEXT,
            Self::Picture(_) => element_type::PICTURE,
            Self::File(_) => element_type::FILE,
            Self::Voice(_) => element_type::VOICE,
            Self::Video(_) => element_type::VIDEO,
            Self::Face(_) => element_type::FACE,
            Self::Reply(_) => element_type::REPLY,
            Self::GrayTip(_) | Self::Revoke(_) => element_type::GRAY_TIP,
            Self::Ark(_) => element_type::ARK,
            Self::MarketFace(_) => element_type::MARKET_FACE,
            Self::MultiForward(_) => element_type::MULTI_FORWARD,
            Self::Opaque { element_type, .. } => *element_type,
        }
    }

    /// Short human-readable rendering, used by listings
    pub fn summary(&self) -> String {
        match self {
            Self::Text(text) => text.content.clone(),
            Self::Picture(_) => "[picture]".to_string(),
            Self::File(file) => format!("[file: {}]", file.file_name),
            Self::Voice(_) => "[voice]".to_string(),
            Self::Video(_) => "[video]".to_string(),
            Self::Face(face) => face
                .face_text
                .clone()
                .unwrap_or_else(|| format!("[face {}]", face.face_index)),
            Self::Reply(_) => "[reply]".to_string(),
            Self::GrayTip(tip) => tip.content.clone(),
            Self::Revoke(_) => "[recalled]".to_string(),
            Self::Ark(_) => "[card]".to_string(),
            Self::MarketFace(face) => format!("[{}]", face.face_name),
            Self::MultiForward(_) => "[forwarded messages]".to_string(),
            Self::Opaque { element_type, .. } => format!("[element {}]", element_type),
        }
    }

    pub fn as_picture(&self) -> Option<&PictureElement> {
        match self {
            Self::Picture(pic) => Some(pic),
            _ => None,
        }
    }

    pub fn as_revoke(&self) -> Option<&RevokeElement> {
        match self {
            Self::Revoke(revoke) => Some(revoke),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextElement {
    pub content: String,
    /// Mentioned user, if this text is an @-mention
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub at_uid: Option<String>,
}

/// Picture attachment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PictureElement {
    /// Content hash, also the download dedup key
    pub md5_hex: String,
    pub file_name: String,
    /// Local path of the full-size image
    pub source_path: String,
    /// Thumbnail paths keyed by thumbnail size
    #[serde(default)]
    pub thumb_paths: BTreeMap<u32, String>,
    /// Server-relative download URL, when the host knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_image_url: Option<String>,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileElement {
    pub file_name: String,
    pub file_path: String,
    pub file_size: u64,
    #[serde(default)]
    pub file_md5: String,
}

/// Voice and video attachments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaElement {
    pub file_name: String,
    pub file_path: String,
    #[serde(default)]
    pub md5_hex: String,
    /// Duration in seconds
    #[serde(default)]
    pub duration: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceElement {
    pub face_index: u32,
    #[serde(default)]
    pub face_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyElement {
    pub source_msg_id: String,
    pub sender_uid: String,
    #[serde(default)]
    pub source_summary: String,
}

/// Informational gray tip other than a recall notice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrayTipElement {
    pub sub_element_type: u32,
    #[serde(default)]
    pub content: String,
}

/// Recall notice, the payload of a tombstone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RevokeElement {
    /// Whether the current user recalled the message
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArkElement {
    /// Raw card JSON as sent by the host
    pub bytes_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketFaceElement {
    pub emoji_id: String,
    pub face_name: String,
    #[serde(default)]
    pub emoji_package_id: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiForwardElement {
    pub res_id: String,
    #[serde(default)]
    pub xml_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picture_derives_file_name() {
        let el = MessageElement::picture("abc", "/data/pics/cat.jpg");
        let pic = el.as_picture().unwrap();
        assert_eq!(pic.file_name, "cat.jpg");
        assert!(pic.thumb_paths.is_empty());
    }

    #[test]
    fn test_element_type_codes() {
        assert_eq!(MessageElement::text("hi").element_type(), element_type::TEXT);
        assert_eq!(
            MessageElement::picture("a", "/p.png").element_type(),
            element_type::PICTURE
        );
        assert_eq!(
            MessageElement::Revoke(RevokeElement::default()).element_type(),
            element_type::GRAY_TIP
        );
        let opaque = MessageElement::Opaque {
            element_type: 42,
            raw: vec![1, 2, 3],
        };
        assert_eq!(opaque.element_type(), 42);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(MessageElement::text("hello")).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["content"], "hello");
        assert!(json.get("at_uid").is_none());
    }

    #[test]
    fn test_opaque_preserves_raw_bytes() {
        let el = MessageElement::Opaque {
            element_type: 99,
            raw: vec![0, 255, 7],
        };
        let json = serde_json::to_string(&el).unwrap();
        let back: MessageElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, el);
    }

    #[test]
    fn test_unknown_kind_becomes_opaque() {
        let json = r#"{"kind":"calendar","element_type":21,"foo":1}"#;
        let el: MessageElement = serde_json::from_str(json).unwrap();
        match el {
            MessageElement::Opaque { element_type, raw } => {
                assert_eq!(element_type, 21);
                let kept: serde_json::Value = serde_json::from_slice(&raw).unwrap();
                assert_eq!(kept["kind"], "calendar");
                assert_eq!(kept["foo"], 1);
            }
            other => panic!("expected opaque element, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_known_kind_becomes_opaque() {
        let el: MessageElement = serde_json::from_str(r#"{"kind":"face"}"#).unwrap();
        assert!(matches!(el, MessageElement::Opaque { element_type: 0, .. }));
    }

    #[test]
    fn test_known_kind_still_typed() {
        let el: MessageElement =
            serde_json::from_str(r#"{"kind":"text","content":"hello"}"#).unwrap();
        assert_eq!(el, MessageElement::text("hello"));
    }

    #[test]
    fn test_summary() {
        assert_eq!(MessageElement::text("hi").summary(), "hi");
        assert_eq!(MessageElement::picture("a", "/p.png").summary(), "[picture]");
        let face = MessageElement::Face(FaceElement {
            face_index: 14,
            face_text: None,
        });
        assert_eq!(face.summary(), "[face 14]");
    }

    #[test]
    fn test_as_revoke() {
        let el = MessageElement::Revoke(RevokeElement {
            is_self_operate: true,
            operator_nick: "Bob".to_string(),
            ..Default::default()
        });
        assert!(el.as_revoke().unwrap().is_self_operate);
        assert!(MessageElement::text("x").as_revoke().is_none());
    }
}
