//! `educollab` — command-line front end for the EduCollab community stores.
//!
//! Every invocation restores the saved session, runs one command against the
//! identity and content stores, prints the result as JSON and exits.
//!
//! # Usage
//!
//! ```
//! educollab signup --name Ada --email ada@uni.edu --password secret
//! educollab post add --title "Study notes" --body "..." --category note
//! educollab --config ~/.config/educollab/educollab.toml group list --mine
//! ```

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Command, Session};
use config::AppConfig;
use educollab_core::Storage;
use educollab_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "educollab", version, about = "EduCollab community data from the terminal")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, value_name = "FILE", default_value = "educollab.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  // Logs go to stderr so stdout carries only JSON.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let cfg = AppConfig::load(&args.config)?;

  let backend = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  let storage = Storage::with_namespace(backend, cfg.namespace.clone());

  let mut session = Session::open(storage, cfg.identity).await?;
  let output = commands::run(args.command, &mut session).await?;

  println!(
    "{}",
    serde_json::to_string_pretty(&output).context("rendering output")?
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use clap::CommandFactory;

  use super::*;

  #[test]
  fn cli_definition_is_consistent() { Args::command().debug_assert(); }

  #[test]
  fn nested_subcommands_parse() {
    let args = Args::try_parse_from([
      "educollab", "group", "list", "--search", "algo", "--study",
    ])
    .unwrap();
    assert!(matches!(
      args.command,
      Command::Group(commands::GroupCommand::List { study: true, community: false, .. })
    ));
  }

  #[test]
  fn study_and_community_conflict() {
    let parsed = Args::try_parse_from([
      "educollab", "group", "list", "--study", "--community",
    ]);
    assert!(parsed.is_err());
  }
}
