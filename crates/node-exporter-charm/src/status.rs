//! Unit status and the state persisted between invocations.
//!
//! Each lifecycle event runs in a fresh process, so whatever the orchestration framework
//! would normally hold for us (status, workload version, opened ports and deferred events)
//! is kept in a small JSON file.

use std::{collections::BTreeSet, fmt, path::Path};

use super::*;

/// Operator-visible status of the unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "kebab-case")]
pub enum Status {
  /// Nothing has happened yet.
  #[default]
  Uninstalled,
  /// Install is in progress.
  Installing,
  /// Waiting on the operator, usually for configuration.
  Blocked(String),
  /// The exporter is installed or running.
  Active(String),
  /// Start is in progress.
  Starting,
  /// Teardown is in progress.
  Stopping,
  /// Teardown has finished.
  Stopped,
  /// A lifecycle transition failed.
  Error(String),
}

impl Status {
  /// Short state name.
  pub fn name(&self) -> &'static str {
    match self {
      Status::Uninstalled => "uninstalled",
      Status::Installing => "installing",
      Status::Blocked(_) => "blocked",
      Status::Active(_) => "active",
      Status::Starting => "starting",
      Status::Stopping => "stopping",
      Status::Stopped => "stopped",
      Status::Error(_) => "error",
    }
  }

  /// Human-readable message shown next to the state.
  pub fn message(&self) -> &str {
    match self {
      Status::Uninstalled | Status::Stopped => "",
      Status::Installing => "Installing node-exporter...",
      Status::Starting => "Starting node-exporter...",
      Status::Stopping => "Uninstalling node-exporter...",
      Status::Blocked(message) | Status::Active(message) | Status::Error(message) => message,
    }
  }
}

impl fmt::Display for Status {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.message() {
      "" => write!(f, "{}", self.name()),
      message => write!(f, "{}: {}", self.name(), message),
    }
  }
}

/// What the unit reports to the outside world.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
  /// Current status
  pub status:           Status,
  /// Version reported by the installed exporter
  pub workload_version: Option<String>,
  /// TCP ports declared reachable
  pub opened_ports:     BTreeSet<u16>,
}

impl UnitState {
  /// Replaces the status, logging the transition.
  pub fn set_status(&mut self, status: Status) {
    debug!("Status {} -> {}", self.status, status);
    self.status = status;
  }

  /// Publishes the workload version.
  pub fn set_workload_version(&mut self, version: impl Into<String>) {
    self.workload_version = Some(version.into());
  }

  /// Declares a TCP port reachable.
  pub fn open_port(&mut self, port: u16) { self.opened_ports.insert(port); }

  /// Withdraws a TCP port.
  pub fn close_port(&mut self, port: u16) { self.opened_ports.remove(&port); }
}

/// Everything persisted between invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredState {
  /// Unit status and published facts
  #[serde(default)]
  pub unit:     UnitState,
  /// Events waiting to be re-delivered, oldest first
  #[serde(default)]
  pub deferred: Vec<Event>,
}

impl StoredState {
  /// Default location of the state file in the user's data directory.
  pub fn default_path() -> PathBuf {
    dirs::data_dir()
      .unwrap_or_else(|| PathBuf::from("."))
      .join("node-exporter-charm")
      .join("state.json")
  }

  /// Reads the state file, starting fresh if it does not exist yet.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` if the file exists but cannot be read or parsed.
  pub fn load(path: &Path) -> Result<Self, CharmErrors> {
    if !path.exists() {
      debug!("No state at {}, starting fresh", path.display());
      return Ok(Self::default());
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
  }

  /// Writes the state file, replacing the previous one atomically.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` if the file cannot be written.
  pub fn save(&self, path: &Path) -> Result<(), CharmErrors> {
    if let Some(parent) = path.parent() {
      trace!("Creating parent directories: {}", parent.display());
      std::fs::create_dir_all(parent)?;
    }
    let staged = path.with_extension("json.tmp");
    std::fs::write(&staged, serde_json::to_string_pretty(self)?)?;
    std::fs::rename(&staged, path)?;
    Ok(())
  }
}
