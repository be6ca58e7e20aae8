//! `tablekeep`: administrative server and operator CLI.
//!
//! Reads `tablekeep.toml` (or the path given with `--config`), opens the
//! SQLite database, and either serves the HTTP surface or runs a single
//! operator command, printing JSON on stdout.
//!
//! ```
//! tablekeep serve
//! tablekeep drop-column --table orders --column order_status
//! tablekeep backups capture --source orders
//! tablekeep backups restore 3 --target orders_copy --dry-run
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tablekeep_core::{
  backup::{ListQuery, RestoreOptions, RestoreOutcome},
  store::{ColumnMigrator, SnapshotStore},
};
use tablekeep_server::ServerConfig;
use tablekeep_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Safe column drops and table snapshots for SQLite")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tablekeep.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (default).
  Serve,

  /// Drop one column from a table by shadow-table copy-swap.
  DropColumn {
    #[arg(long)]
    table:  String,
    #[arg(long)]
    column: String,
  },

  /// Inspect, capture and restore snapshots.
  #[command(subcommand)]
  Backups(BackupsCommand),
}

#[derive(Subcommand)]
enum BackupsCommand {
  /// List snapshots, newest first.
  List {
    #[arg(long)]
    source: Option<String>,
    #[arg(long)]
    limit:  Option<u32>,
  },

  /// Show one snapshot.
  Show {
    id: i64,
    /// Include the JSON payload.
    #[arg(long)]
    include_data: bool,
  },

  /// Snapshot a table, or the rows of a read-only query.
  Capture {
    #[arg(long)]
    source: String,
    #[arg(long)]
    query:  Option<String>,
  },

  /// Restore a snapshot into a brand-new table.
  Restore {
    id: i64,
    #[arg(long)]
    target:  Option<String>,
    /// Report what would be created without touching the database.
    #[arg(long)]
    dry_run: bool,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so command output on stdout stays machine-readable.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  let server_cfg = ServerConfig::load(&cli.config)?;

  let database_path = server_cfg.database_path();
  let store = SqliteStore::open(&database_path)
    .await
    .with_context(|| format!("failed to open database at {database_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::DropColumn { table, column } => {
      let outcome = store
        .drop_column(&table, &column)
        .await
        .with_context(|| format!("failed to drop {column:?} from {table:?}"))?;
      tracing::info!("{}", outcome.message());
      print_json(&outcome)
    }
    Command::Backups(cmd) => backups(cmd, &store).await,
  }
}

async fn serve(server_cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let registered = server_cfg
    .migrations
    .iter()
    .map(|m| m.name.as_str())
    .collect::<Vec<_>>()
    .join(", ");
  tracing::info!("Registered migrations: [{registered}]");

  let address = server_cfg.address();
  let app = tablekeep_server::router(Arc::new(store), server_cfg.migrations);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn backups(cmd: BackupsCommand, store: &SqliteStore) -> anyhow::Result<()> {
  match cmd {
    BackupsCommand::List { source, limit } => {
      let list = store
        .list_backups(&ListQuery { source_table: source, limit })
        .await
        .context("failed to list backups")?;
      print_json(&list)
    }
    BackupsCommand::Show { id, include_data } => {
      let record = store
        .get_backup(id, include_data)
        .await
        .context("failed to load backup")?
        .with_context(|| format!("backup {id} not found"))?;
      print_json(&record)
    }
    BackupsCommand::Capture { source, query } => {
      let summary = store
        .capture_backup(&source, query.as_deref())
        .await
        .with_context(|| format!("failed to capture {source:?}"))?;
      print_json(&summary)
    }
    BackupsCommand::Restore { id, target, dry_run } => {
      let outcome = store
        .restore_backup(id, RestoreOptions { target_table: target, dry_run })
        .await
        .with_context(|| format!("failed to restore backup {id}"))?
        .with_context(|| format!("backup {id} not found"))?;
      match outcome {
        RestoreOutcome::Preview(preview) => print_json(&preview),
        RestoreOutcome::Restored(report) => print_json(&report),
      }
    }
  }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
