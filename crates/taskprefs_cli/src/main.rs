//! Command-line front end for task list preferences.
//!
//! # Responsibility
//! - Apply one preference mutation against the configured store.
//! - Print the resulting task list view as JSON.

use clap::{Parser, Subcommand};
use futures::StreamExt;
use log::{info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use taskprefs_core::{
    core_version, init_logging, CoreConfig, InMemoryTaskRepository, PreferenceStore,
    SqlitePreferenceStore, TasksViewService, UserPreferencesRepository,
};

#[derive(Debug, Parser)]
#[command(name = "taskprefs", version, about = "Inspect and change task list preferences")]
struct Cli {
    /// JSON config file; `TASKPREFS_*` variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// SQLite preference file. Overrides config and environment.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the current task list view.
    Show,
    /// Show or hide completed tasks.
    ShowCompleted {
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Turn sorting by deadline on or off.
    SortDeadline {
        #[arg(action = clap::ArgAction::Set)]
        enable: bool,
    },
    /// Turn sorting by priority on or off.
    SortPriority {
        #[arg(action = clap::ArgAction::Set)]
        enable: bool,
    },
}

impl Command {
    fn mutates(&self) -> bool {
        !matches!(self, Self::Show)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("taskprefs: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }
    info!(
        "event=cli_start module=cli status=ok version={}",
        core_version()
    );

    let store = match &config.db_path {
        Some(path) => SqlitePreferenceStore::open(path)?,
        None => {
            if cli.command.mutates() {
                warn!("event=cli_store module=cli status=degraded store=memory persisted=false");
                eprintln!("taskprefs: no --db configured; this change is not persisted");
            }
            SqlitePreferenceStore::open_in_memory()?
        }
    };
    let service = TasksViewService::new(
        UserPreferencesRepository::new(Arc::new(store)),
        Arc::new(InMemoryTaskRepository::with_sample_tasks()),
    );

    apply(&service, &cli.command).await?;

    let mut models = service.ui_model_stream();
    let model = models
        .next()
        .await
        .ok_or("task view stream ended before producing a value")??;
    println!("{}", serde_json::to_string_pretty(&model)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<CoreConfig, Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => CoreConfig::from_json_file(path)?,
        None => CoreConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(db) = &cli.db {
        config.db_path = Some(db.clone());
    }
    Ok(config)
}

async fn apply<S>(
    service: &TasksViewService<S, InMemoryTaskRepository>,
    command: &Command,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: PreferenceStore + 'static,
{
    match *command {
        Command::Show => {}
        Command::ShowCompleted { value } => service.show_completed_tasks(value).await?,
        Command::SortDeadline { enable } => {
            service.enable_sort_by_deadline(enable).await?;
        }
        Command::SortPriority { enable } => {
            service.enable_sort_by_priority(enable).await?;
        }
    }
    Ok(())
}
