// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! recallkeep - keeps recalled chat messages readable
//!
//! Entry point for the recallkeep CLI.

use clap::Parser;

use recallkeep::cli::{Cli, Commands};
use recallkeep::config::Settings;
use recallkeep::error::Result;

#[path = "main/cli_commands.rs"]
mod cli_commands;

use cli_commands::{
    run_chats, run_clear, run_config, run_list, run_replay, run_show, run_size,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // `RUST_LOG` still takes precedence over `-v`
    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());

    let directive = match cli.verbose {
        0 => None,
        1 => Some("recallkeep=debug"),
        _ => Some("recallkeep=trace"),
    };
    if let Some(directive) = directive {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let settings = Settings::load_from(&config_path)?;
    settings.validate()?;

    let user = cli.user.as_str();
    match cli.command {
        Commands::Replay(args) => run_replay(args, &settings, user).await?,
        Commands::Size => run_size(&settings, user).await?,
        Commands::Chats => run_chats(&settings, user).await?,
        Commands::List(args) => run_list(args, &settings, user).await?,
        Commands::Show(args) => run_show(args, &settings, user).await?,
        Commands::Clear(args) => run_clear(args, &settings, user).await?,
        Commands::Config(args) => run_config(args, settings, &config_path)?,
    }

    Ok(())
}
