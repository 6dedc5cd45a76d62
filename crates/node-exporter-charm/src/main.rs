//! Lifecycle agent for a Prometheus `node_exporter` on a systemd host.
//!
//! Every invocation delivers one lifecycle event (or re-delivers the deferred ones), then
//! persists the unit state for the next invocation:
//!
//! ```text
//! node-exporter-charm install --node-exporter-version 1.7.0
//! node-exporter-charm start
//! node-exporter-charm status
//! node-exporter-charm stop
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  path::{Path, PathBuf},
  process::ExitCode,
};

use clap::{builder::ArgAction, Args, Parser, Subcommand};
use console::{style, Emoji};
use node_exporter_ops::{InstallLayout, Installer, ReleaseOrigin, SystemHost};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
#[cfg(test)] use tracing_test::traced_test;

use crate::{
  charm::{Event, NodeExporterCharm, Outcome},
  config::CharmConfig,
  dispatch::Dispatcher,
  errors::CharmErrors,
  metrics::scrape_jobs,
  status::{Status, StoredState, UnitState},
};

pub mod charm;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod metrics;
pub mod status;
#[cfg(test)] mod test_support;

static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "");
static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "");
static BROOM: Emoji<'_, '_> = Emoji("🧹 ", "");
static REPEAT: Emoji<'_, '_> = Emoji("🔁 ", "");
static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "");
static FAILURE: Emoji<'_, '_> = Emoji("✖ ", "");
static SUCCESS: Emoji<'_, '_> = Emoji("✨ ", "");

#[derive(Parser)]
#[command(author, version, about = "Installs and supervises a Prometheus node_exporter")]
struct Cli {
  /// Verbose mode (-v, -vv, -vvv)
  #[arg(
        short,
        long,
        action = ArgAction::Count,
        global = true,
        help = "Increase logging verbosity"
    )]
  verbose:    u8,
  /// JSON configuration file
  #[arg(long, global = true)]
  config:     Option<PathBuf>,
  /// Where unit state is kept between invocations
  #[arg(long, global = true)]
  state_file: Option<PathBuf>,
  /// Also write daily-rotated logs to this directory
  #[arg(long, global = true)]
  log_dir:    Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

/// Configuration overrides accepted by commands that may install.
#[derive(Args, Default)]
struct ConfigArgs {
  /// node_exporter release to install, e.g. 1.7.0
  #[arg(long, env = "NODE_EXPORTER_VERSION")]
  node_exporter_version: Option<String>,
  /// Release architecture, e.g. amd64 or arm64
  #[arg(long = "arch")]
  architecture:          Option<String>,
  /// HTTP(S) base URL or local mirror directory to fetch releases from
  #[arg(long)]
  release_origin:        Option<String>,
}

#[derive(Subcommand)]
enum Commands {
  /// Install node_exporter as a systemd service
  Install {
    #[command(flatten)]
    config: ConfigArgs,
  },
  /// Start the node_exporter service
  Start {
    #[command(flatten)]
    config: ConfigArgs,
  },
  /// Stop node_exporter and remove everything install created
  Stop,
  /// Re-deliver deferred events
  Reemit {
    #[command(flatten)]
    config: ConfigArgs,
  },
  /// Show the unit's status
  Status,
  /// Print the Prometheus scrape jobs for this unit as JSON
  ScrapeJobs,
}

/// Setup logging with the specified verbosity level, optionally mirrored to a log directory
fn setup_logging(verbosity: u8, log_dir: Option<&Path>) -> Result<(), CharmErrors> {
  let filter = match verbosity {
    0 => "warn",
    1 => "info",
    2 => "debug",
    _ => "trace",
  };

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

  let file_layer = match log_dir {
    Some(dir) => {
      let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("node-exporter-charm")
        .filename_suffix("log")
        .build(dir)?;
      Some(fmt::layer().with_ansi(false).with_target(true).with_writer(appender))
    },
    None => None,
  };

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(true),
    )
    .with(file_layer)
    .init();
  Ok(())
}

/// Builds the effective configuration from the config file and command line.
fn load_config(path: Option<&Path>, args: ConfigArgs) -> Result<CharmConfig, CharmErrors> {
  let config = match path {
    Some(path) => CharmConfig::load(path)?,
    None => CharmConfig::default(),
  };
  Ok(config.with_overrides(args.node_exporter_version, args.architecture, args.release_origin))
}

/// Builds the configuration `event` is delivered with.
///
/// Teardown needs no configuration, so a broken config file or release origin never keeps
/// `stop` from running.
fn config_for(
  event: Option<Event>,
  path: Option<&Path>,
  args: ConfigArgs,
) -> Result<CharmConfig, CharmErrors> {
  if event == Some(Event::Stop) {
    debug!("Ignoring configuration for stop");
    return Ok(CharmConfig::default());
  }
  load_config(path, args)
}

/// Prints the unit's status and published facts.
fn print_status(state: &StoredState) {
  let unit = &state.unit;
  let status = match unit.status {
    Status::Active(_) => style(unit.status.to_string()).green(),
    Status::Blocked(_) => style(unit.status.to_string()).yellow(),
    Status::Error(_) => style(unit.status.to_string()).red(),
    _ => style(unit.status.to_string()).cyan(),
  };
  println!("   {} {}", style("Status:").green().bold(), status);

  if let Some(version) = &unit.workload_version {
    println!("   {} {}", style("Version:").green().bold(), style(version).white());
  }
  if !unit.opened_ports.is_empty() {
    let ports = unit.opened_ports.iter().map(|p| format!("{p}/tcp")).collect::<Vec<_>>();
    println!("   {} {}", style("Ports:").green().bold(), style(ports.join(", ")).white());
  }
  if !state.deferred.is_empty() {
    let events = state.deferred.iter().map(Event::to_string).collect::<Vec<_>>();
    println!("   {} {}", style("Deferred:").yellow().bold(), style(events.join(", ")).yellow());
  }
}

/// Delivers the requested event and persists the resulting state.
async fn run(cli: Cli) -> Result<(), CharmErrors> {
  setup_logging(cli.verbose, cli.log_dir.as_deref())?;

  let state_path = cli.state_file.unwrap_or_else(StoredState::default_path);
  trace!("Using state at: {}", state_path.display());

  let (event, args) = match cli.command {
    Commands::Status => {
      print_status(&StoredState::load(&state_path)?);
      return Ok(());
    },
    Commands::ScrapeJobs => {
      println!("{}", serde_json::to_string(&scrape_jobs(InstallLayout::default().port))?);
      return Ok(());
    },
    Commands::Install { config } => {
      println!("{} Installing node-exporter", style(PACKAGE).cyan());
      (Some(Event::Install), config)
    },
    Commands::Start { config } => {
      println!("{} Starting node-exporter", style(ROCKET).cyan());
      (Some(Event::Start), config)
    },
    Commands::Stop => {
      println!("{} Removing node-exporter", style(BROOM).cyan());
      (Some(Event::Stop), ConfigArgs::default())
    },
    Commands::Reemit { config } => {
      println!("{} Re-delivering deferred events", style(REPEAT).cyan());
      (None, config)
    },
  };

  let config = config_for(event, cli.config.as_deref(), args)?;
  debug!("Effective config: {:?}", config);
  let origin = match &config.release_origin {
    Some(origin) => ReleaseOrigin::parse(origin)?,
    None => ReleaseOrigin::default(),
  };

  let stored = StoredState::load(&state_path)?;
  let installer = Installer::new(InstallLayout::default(), SystemHost, origin);
  let charm = NodeExporterCharm::new(installer, stored.unit);
  let mut dispatcher = Dispatcher::new(charm, stored.deferred);

  let result = match event {
    Some(event) => dispatcher.dispatch(event, &config).await.map(Some),
    None => dispatcher.reemit(&config).await.map(|()| None),
  };

  let state = dispatcher.into_state();
  state.save(&state_path)?;

  match result? {
    Some(Outcome::Deferred) => {
      println!("\n{} Event deferred until configuration changes", style(WARNING).yellow())
    },
    _ => println!("\n{} Done", style(SUCCESS).green()),
  }
  print_status(&state);
  Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
  match run(Cli::parse()).await {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{} {}", style(FAILURE).red(), style(&e).red());
      ExitCode::FAILURE
    },
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;

  use super::*;

  #[test]
  fn test_stop_ignores_broken_config() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "release-origin": "https://[broken" "#)?;

    let config = config_for(Some(Event::Stop), Some(&path), ConfigArgs::default())?;
    assert_eq!(config, CharmConfig::default());
    assert!(config_for(Some(Event::Install), Some(&path), ConfigArgs::default()).is_err());
    Ok(())
  }
}
