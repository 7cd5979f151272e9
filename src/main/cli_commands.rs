// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use recallkeep::cache::{RecallController, RecallListener};
use recallkeep::cli::{ClearArgs, ConfigArgs, ConfigCommands, ListArgs, ReplayArgs, ShowArgs};
use recallkeep::config::Settings;
use recallkeep::error::Result;
use recallkeep::message::MessageRecord;

/// Prints reconstruction events as they happen
struct PrintListener;

impl RecallListener for PrintListener {
    fn on_reconstructed(&self, msg_ids: &[String]) {
        for id in msg_ids {
            println!("reconstructed {}", id);
        }
    }

    fn on_cache_size_changed(&self, size: u64) {
        tracing::debug!("Recall cache now holds {} message(s)", size);
    }
}

fn format_time(epoch_secs: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| epoch_secs.to_string())
}

fn print_record(record: &MessageRecord) {
    println!(
        "  {}  {}  {}: {}",
        record.msg_id,
        format_time(record.send_time),
        record.sender_id,
        record.summary()
    );
    if let Some(recall) = &record.recall {
        let by = if recall.operator_nick.is_empty() {
            "unknown"
        } else {
            recall.operator_nick.as_str()
        };
        println!("      recalled by {} at {}", by, format_time(recall.recall_time));
    }
}

/// Replay a recorded stream
pub(super) async fn run_replay(args: ReplayArgs, settings: &Settings, user: &str) -> Result<()> {
    let batches = recallkeep::cli::replay::read_batches(&args.file).await?;

    let mut controller = RecallController::from_settings(settings, user).await?;
    controller.set_listener(Arc::new(PrintListener));

    let mut reconstructed = 0usize;
    for batch in batches {
        let outcome = controller.process_batch(batch).await;
        reconstructed += outcome.reconstructed.len();
    }

    if !args.no_wait {
        controller.wait_for_downloads().await;
    }

    println!(
        "\n{} message(s) reconstructed, {} stored",
        reconstructed,
        controller.cache_size()
    );
    Ok(())
}

pub(super) async fn run_size(settings: &Settings, user: &str) -> Result<()> {
    let controller = RecallController::from_settings(settings, user).await?;
    println!("{}", controller.cache_size());
    Ok(())
}

pub(super) async fn run_chats(settings: &Settings, user: &str) -> Result<()> {
    let mut controller = RecallController::from_settings(settings, user).await?;
    let chats = controller.recalled_chats().await;

    if chats.is_empty() {
        println!("No recalled messages.");
        return Ok(());
    }

    println!("\nConversations with recalled messages");
    println!("─────────────────────────────────────");
    for chat in chats {
        let name = chat.peer_name.as_deref().unwrap_or(&chat.chat_id);
        println!(
            "  {:<24} {:?}  {} message(s), latest {}",
            name,
            chat.chat_type,
            chat.message_count,
            format_time(chat.latest_send_time)
        );
    }
    println!("─────────────────────────────────────\n");
    Ok(())
}

pub(super) async fn run_list(args: ListArgs, settings: &Settings, user: &str) -> Result<()> {
    let mut controller = RecallController::from_settings(settings, user).await?;
    let records = controller.list_by_chat(&args.chat_id).await;

    if records.is_empty() {
        println!("No recalled messages in {}.", args.chat_id);
        return Ok(());
    }

    println!("\nRecalled messages in {}", args.chat_id);
    for record in &records {
        print_record(record);
    }
    println!();
    Ok(())
}

pub(super) async fn run_show(args: ShowArgs, settings: &Settings, user: &str) -> Result<()> {
    let mut controller = RecallController::from_settings(settings, user).await?;
    match controller.original_by_id(&args.msg_id).await {
        Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
        None => eprintln!("No stored message with id {}", args.msg_id),
    }
    Ok(())
}

pub(super) async fn run_clear(args: ClearArgs, settings: &Settings, user: &str) -> Result<()> {
    let mut controller = RecallController::from_settings(settings, user).await?;
    let size = controller.cache_size();

    if size == 0 {
        println!("Nothing to clear.");
        return Ok(());
    }

    if !args.yes {
        print!(
            "Delete {} recalled message(s) from {}? [y/N] ",
            size,
            controller.store_dir().display()
        );
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    controller.clear_all().await?;
    println!("Cleared {} recalled message(s).", size);
    Ok(())
}

/// Run config subcommands
pub(super) fn run_config(args: ConfigArgs, mut settings: Settings, path: &Path) -> Result<()> {
    match args.command {
        None | Some(ConfigCommands::Show) => {
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        Some(ConfigCommands::Get { key }) => {
            println!("{}", settings.get_key(&key)?);
        }
        Some(ConfigCommands::Set { key, value }) => {
            settings.set_key(&key, &value)?;
            settings.save_to(path)?;
            println!("Setting '{}' updated.", key);
        }
        Some(ConfigCommands::Reset) => {
            Settings::default().save_to_clean(path)?;
            println!("Settings reset to defaults in {}.", path.display());
        }
    }
    Ok(())
}
