//! `kmlm` - CLI for kmlmission
//!
//! This binary imports KML boundary documents as missions and reads them
//! back from the local mission database.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use kmlmission::cli::{Cli, Command, ConfigCommand, DecodeCommand, ImportCommand, ListCommand};
use kmlmission::ingest::stage_upload;
use kmlmission::{
    init_logging, Config, ErrorResponse, KmlDecoder, MissionIngestor, MissionStore,
    SqliteMissionStore,
};

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone()).context("loading configuration")?;

    match cli.command {
        Command::Import(cmd) => handle_import(&config, cmd),
        Command::Show(cmd) => handle_show(&config, cmd.id),
        Command::List(cmd) => handle_list(&config, &cmd),
        Command::Decode(cmd) => handle_decode(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn open_ingestor(
    config: &Config,
    policy: Option<kmlmission::cli::PolicyArg>,
) -> anyhow::Result<MissionIngestor<SqliteMissionStore>> {
    let store = SqliteMissionStore::open(config.database_path())
        .context("opening mission database")?;
    let mut ingestor = MissionIngestor::from_config(store, &config.ingest);
    if let Some(policy) = policy {
        ingestor = ingestor.with_decoder(KmlDecoder::with_policy(policy.into()));
    }
    Ok(ingestor)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print an error response and pick the exit code.
fn report(err: &kmlmission::Error) -> anyhow::Result<ExitCode> {
    tracing::error!("{}", err);
    print_json(&ErrorResponse::from(err))?;
    Ok(if err.is_client_error() {
        ExitCode::from(2)
    } else {
        ExitCode::FAILURE
    })
}

fn handle_import(config: &Config, cmd: ImportCommand) -> anyhow::Result<ExitCode> {
    let ingestor = open_ingestor(config, cmd.policy)?;
    let file = stage_upload(&cmd.file, &config.staging_dir())
        .with_context(|| format!("staging {}", cmd.file.display()))?;

    match ingestor.upload(Some(file), cmd.name.as_deref()) {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report(&err),
    }
}

fn handle_show(config: &Config, id: i64) -> anyhow::Result<ExitCode> {
    let ingestor = open_ingestor(config, None)?;
    match ingestor.get_mission(id) {
        Ok(response) => {
            print_json(&response)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report(&err),
    }
}

fn handle_list(config: &Config, cmd: &ListCommand) -> anyhow::Result<ExitCode> {
    let ingestor = open_ingestor(config, None)?;
    let missions = ingestor.store().list(cmd.limit)?;

    if cmd.json {
        print_json(&missions)?;
    } else if missions.is_empty() {
        println!("No missions stored.");
    } else {
        println!("{:>6}  {:>8}  {:<25}  NAME", "ID", "VERTICES", "CREATED");
        for mission in &missions {
            println!(
                "{:>6}  {:>8}  {:<25}  {}",
                mission.id,
                mission.vertex_count,
                mission.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                mission.name
            );
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_decode(config: &Config, cmd: &DecodeCommand) -> anyhow::Result<ExitCode> {
    let policy = cmd
        .policy
        .map_or(config.ingest.coordinate_policy, Into::into);
    let content =
        std::fs::read(&cmd.file).with_context(|| format!("reading {}", cmd.file.display()))?;

    match KmlDecoder::with_policy(policy).decode(&content) {
        Ok(polygon) => {
            print_json(&polygon)?;
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => report(&err),
    }
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                print_json(config)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Ingest]");
                println!(
                    "  Default name:       {}",
                    config.ingest.default_mission_name
                );
                println!("  Staging dir:        {}", config.staging_dir().display());
                println!(
                    "  Coordinate policy:  {:?}",
                    config.ingest.coordinate_policy
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => {
                    println!("Configuration error: {e}");
                    return Ok(ExitCode::FAILURE);
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
