use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use issue_db::commands::{SetOptions, cmd_delete, cmd_get, cmd_label, cmd_list, cmd_set};
use issue_db::{Config, IssueDb, Result};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "issue-db")]
#[command(about = "A JSON document store backed by GitHub issues")]
#[command(version)]
struct Cli {
    /// Path to config file (default: ./.issue-db.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Repository holding the records (owner/name)
    #[arg(short, long, global = true)]
    repo: Option<String>,

    /// Label marking managed issues
    #[arg(short, long, global = true)]
    label: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a record as JSON
    Get {
        key: String,

        /// Include deleted (closed) records
        #[arg(long)]
        all: bool,
    },

    /// Create a record, or replace its data if it exists
    Set {
        key: String,

        /// JSON document to store
        json: String,

        /// Prose placed before the data
        #[arg(long)]
        before: Option<String>,

        /// Prose placed after the data
        #[arg(long)]
        after: Option<String>,

        /// Label to carry besides the management label (repeatable); replaces the
        /// labels of an existing record
        #[arg(long = "add-label", action = clap::ArgAction::Append)]
        labels: Vec<String>,

        /// Assignee (repeatable)
        #[arg(long = "assignee", action = clap::ArgAction::Append)]
        assignees: Vec<String>,
    },

    /// Soft-delete a record by closing its issue
    Delete { key: String },

    /// List records
    #[command(visible_alias = "ls")]
    List {
        /// Include deleted (closed) records
        #[arg(long)]
        all: bool,

        /// Print only keys
        #[arg(long)]
        keys: bool,
    },

    /// Create the management label if it is missing
    Label,
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(repo) = &cli.repo {
        config.repo = Some(repo.clone());
    }
    if let Some(label) = &cli.label {
        config.label = label.clone();
    }
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<String> {
    let config = load_config(&cli)?;
    let mut db = IssueDb::from_config(&config)?;

    match cli.command {
        Commands::Get { key, all } => cmd_get(&mut db, &key, all).await,
        Commands::Set {
            key,
            json,
            before,
            after,
            labels,
            assignees,
        } => {
            let options = SetOptions {
                text_before: before,
                text_after: after,
                labels: (!labels.is_empty()).then_some(labels),
                assignees: (!assignees.is_empty()).then_some(assignees),
            };
            cmd_set(&mut db, &key, &json, options).await
        }
        Commands::Delete { key } => cmd_delete(&mut db, &key).await,
        Commands::List { all, keys } => cmd_list(&mut db, all, keys).await,
        Commands::Label => cmd_label(&mut db).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ISSUE_DB_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
