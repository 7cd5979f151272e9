// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI module for recallkeep
//!
//! Handles command-line argument parsing and reading recorded streams.

pub mod args;
pub mod replay;

pub use args::*;
