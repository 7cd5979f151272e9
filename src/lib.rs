// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! recallkeep - reconstructs chat messages after they are recalled.
//!
//! The host delivers messages in batches. When a "message recalled" notice
//! arrives, the cache answers it with the original content, which it keeps
//! in memory and, once aged out, in compressed segment files on disk.
//!
//! Architecture highlights:
//! - `message`: records, content elements and recall tombstones
//! - `cache`: hot ring, active buffer, segment store and the controller
//! - `rehydrate`: picture path rewriting and background re-download
//! - `config`, `cli`: settings file and command-line surface

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod message;
pub mod rehydrate;

pub use error::{RecallError, Result};
