mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tidemark_core::{MigrationConfig, MigrationRunner};

#[derive(Parser)]
#[command(name = "tidemark", version)]
#[command(about = "Transactional, ledger-tracked PostgreSQL migrations")]
struct Cli {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Directory scanned for migration files (repeatable, scanned in order)
    #[arg(long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// Name of the ledger table
    #[arg(long, global = true, default_value = "tidemark_migrations")]
    table: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply every pending migration in order
    All,

    /// Show each discovered migration and whether it is applied
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Apply a single migration file
    Apply {
        /// Path to the migration file
        path: PathBuf,
    },

    /// Revert a single applied migration file
    Revert {
        /// Path to the migration file
        path: PathBuf,
    },

    /// Create a new migration stub
    Create {
        /// Migration name (becomes part of the filename)
        name: String,

        /// Directory to write the stub into
        directory: PathBuf,
    },
}

// Exit codes: 0 success, 1 runtime error, 2 usage error (clap's default).
#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        database_url,
        roots,
        table,
        command,
    } = cli;

    // Scaffolding never touches the database.
    if let Commands::Create { name, directory } = &command {
        return commands::create(name, directory);
    }

    let database_url = database_url
        .context("a database URL is required (--database-url or DATABASE_URL)")?;
    let config = MigrationConfig {
        roots: if roots.is_empty() {
            MigrationConfig::default().roots
        } else {
            roots
        },
        table,
    };
    let runner = MigrationRunner::from_url(&database_url, config).await?;

    match command {
        Commands::All => commands::apply_all(&runner).await,
        Commands::List { json } => commands::list(&runner, json).await,
        Commands::Apply { path } => commands::apply(&runner, &path).await,
        Commands::Revert { path } => commands::revert(&runner, &path).await,
        Commands::Create { .. } => unreachable!("handled before connecting"),
    }
}
