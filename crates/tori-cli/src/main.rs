mod commands;
mod logging;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use tori_core::{block, AppConfig, SyncEngine};
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match tori_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let Some(command) = args.command else {
        let _ = Cli::command().print_long_help();
        return;
    };

    if let Err(err) = run(command, config) {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(command: Commands, config: AppConfig) -> anyhow::Result<()> {
    match command {
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config);
        }
        Commands::Snapshot => {
            let engine = open_engine(config)?;
            let stored = engine.save_folders().context("failed to store snapshot")?;
            info!("Snapshot stored for {} folders", format!("{}", stored).green());
        }
        Commands::Sync => {
            let engine = open_engine(config)?;
            let reporter = CliReporter::new();
            let updated = engine.sync_folders(&reporter).context("sync failed")?;
            drop(reporter);
            if updated {
                info!(
                    "{} {}",
                    "Folder changes applied and datablock rebuilt:".green(),
                    engine.data_block_path().display()
                );
            } else {
                info!("{}", "No changes, sync skipped".cyan());
            }
        }
        Commands::Fetch { since } => {
            let engine = open_engine(config)?;
            let client_time = since.as_deref().map(parse_timestamp).transpose()?;
            match engine.get_data_block(client_time)? {
                Some(data_block) => println!("{}", serde_json::to_string_pretty(&data_block)?),
                None => info!("{}", "Client datablock is up to date".cyan()),
            }
        }
        Commands::Dump { output } => {
            let data_block = block::load_data_block(&config.data_block_path())
                .context("failed to load datablock")?;
            block::save_data_block_text(Path::new(&output), &data_block)
                .with_context(|| format!("failed to write {}", output))?;
            info!("Saved datablock to {}", output);
        }
        Commands::ResetDb => {
            let engine = open_engine(config)?;
            if prompt_confirm(
                "Are you SURE you want to remove every folder and file from the database?",
                Some(false),
            )? {
                engine.database().clear_database()?;
                println!("All catalog rows removed");
            }
        }
    }

    Ok(())
}

fn open_engine(config: AppConfig) -> anyhow::Result<SyncEngine> {
    let db_path = config.db_path.clone();
    SyncEngine::open(config).with_context(|| format!("failed to open database {}", db_path))
}

fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    let parsed = DateTime::parse_from_rfc3339(value)
        .with_context(|| format!("invalid RFC 3339 timestamp: {}", value))?;
    Ok(parsed.with_timezone(&Utc))
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
