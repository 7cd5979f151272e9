// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Message data model
//!
//! Records observed on the host stream, their typed content elements, and
//! the tombstones that announce a recall.

pub mod element;
pub mod record;
pub mod stream;

pub use element::{MessageElement, PictureElement, RevokeElement};
pub use record::{ChatType, MessageRecord, RecallAnnotation};
pub use stream::{HostMessage, RecallTombstone, StreamElement};
