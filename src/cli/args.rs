// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// recallkeep - keeps recalled chat messages readable
#[derive(Parser, Debug)]
#[command(name = "recallkeep")]
#[command(version, about = "Reconstruct and inspect recalled chat messages")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Account whose cache to use
    #[arg(short, long, global = true, default_value = "default")]
    pub user: String,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Feed a recorded message stream through the cache
    Replay(ReplayArgs),

    /// Show how many recalled messages are stored
    Size,

    /// List conversations with recalled messages
    Chats,

    /// List recalled messages of one conversation
    List(ListArgs),

    /// Print the stored original of a recalled message
    Show(ShowArgs),

    /// Delete every stored recalled message
    Clear(ClearArgs),

    /// Show or change settings
    Config(ConfigArgs),
}

#[derive(clap::Args, Debug)]
pub struct ReplayArgs {
    /// JSON-lines file, one batch (array of host messages) per line
    pub file: PathBuf,

    /// Do not wait for picture downloads before exiting
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Conversation (peer uid)
    pub chat_id: String,
}

#[derive(clap::Args, Debug)]
pub struct ShowArgs {
    pub msg_id: String,
}

#[derive(clap::Args, Debug)]
pub struct ClearArgs {
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: Option<ConfigCommands>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective settings
    Show,

    /// Print one setting
    Get {
        /// Dotted key (e.g., "recall.flush_threshold")
        key: String,
    },

    /// Change one setting and save it
    Set {
        /// Dotted key (e.g., "recall.redirect_pictures")
        key: String,

        /// New value, JSON or a plain string
        value: String,
    },

    /// Overwrite the settings file with defaults
    Reset,
}
