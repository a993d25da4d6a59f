//! Sonnet CLI - keep a local blog library in sync with the cloud

mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::{CommandFactory, Parser};
use sonnet_core::models::DocumentAction;

use crate::cli::{Cli, Commands};
use crate::commands::actions::{run_action, run_actions};
use crate::commands::check::run_check;
use crate::commands::common::resolve_db_path;
use crate::commands::config::run_config;
use crate::commands::delete::run_delete;
use crate::commands::list::{run_list, Listing};
use crate::commands::log::run_log;
use crate::commands::sync::run_sync;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sonnet=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);
    let profile = cli.profile.as_deref();

    match cli.command {
        Some(Commands::Check { json }) => run_check(json, &db_path, profile).await?,
        Some(Commands::Sync { json }) => run_sync(json, &db_path, profile).await?,
        Some(Commands::Log { id, limit, json }) => {
            run_log(id.as_deref(), limit, json, &db_path, profile).await?;
        }
        Some(Commands::List { json }) => {
            run_list(Listing::Library, json, &db_path, profile).await?;
        }
        Some(Commands::Trash { json }) => {
            run_list(Listing::Trash, json, &db_path, profile).await?;
        }
        Some(Commands::Actions { id }) => run_actions(&id, &db_path, profile).await?,
        Some(Commands::Archive { id }) => {
            run_action(&id, DocumentAction::Archive, &db_path, profile).await?;
        }
        Some(Commands::Restore { id }) => {
            run_action(&id, DocumentAction::Restore, &db_path, profile).await?;
        }
        Some(Commands::Delete { id }) => run_delete(&id, &db_path, profile).await?,
        Some(Commands::Config { command }) => run_config(command, profile)?,
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
