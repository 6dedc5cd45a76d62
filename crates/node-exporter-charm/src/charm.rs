//! The lifecycle controller.
//!
//! Maps each lifecycle event onto exactly one [`Installer`] operation and keeps the unit's
//! status in step:
//!
//! ```text
//! install ──(no version)──▶ Blocked            (event deferred)
//!    │
//!    └──▶ Installing ──ok──▶ Active("node-exporter installed")
//!                     └─err─▶ Error(..)         (error returned)
//! start   ──▶ Starting ──▶ Active("")           (start failures only logged)
//! stop    ──▶ Stopping ──▶ Stopped              (teardown failures only logged)
//! ```
//!
//! The controller never re-delivers events itself. A deferred install is reported as
//! [`Outcome::Deferred`] and queued by the [`Dispatcher`](crate::dispatch::Dispatcher).

use std::fmt;

use node_exporter_ops::{ExporterError, ExporterRelease, HostOps, Installer, ReleaseSource};

use super::*;

/// Status message shown while waiting for configuration.
pub const NEEDS_VERSION: &str = "Need node-exporter-version config to continue.";

/// Status message after a successful install.
pub const INSTALLED: &str = "node-exporter installed";

/// Lifecycle events delivered by the orchestration framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Event {
  /// Install the exporter
  Install,
  /// Start the exporter's service
  Start,
  /// Stop and remove the exporter
  Stop,
}

impl fmt::Display for Event {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Event::Install => write!(f, "install"),
      Event::Start => write!(f, "start"),
      Event::Stop => write!(f, "stop"),
    }
  }
}

/// How the controller disposed of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
  /// The event was handled.
  Completed,
  /// The event needs configuration that is not there yet and must be delivered again later.
  Deferred,
}

/// Controller for a single node_exporter unit.
pub struct NodeExporterCharm<H, R> {
  /// Performs the host side of every transition
  installer: Installer<H, R>,
  /// Status and published facts
  unit:      UnitState,
}

impl<H: HostOps, R: ReleaseSource> NodeExporterCharm<H, R> {
  /// Creates a controller resuming from a previously stored unit state.
  pub fn new(installer: Installer<H, R>, unit: UnitState) -> Self { Self { installer, unit } }

  /// The unit as the outside world sees it.
  pub fn unit(&self) -> &UnitState { &self.unit }

  /// The installer driving the host.
  pub fn installer(&self) -> &Installer<H, R> { &self.installer }

  /// Consumes the controller, returning the unit state for persisting.
  pub fn into_unit(self) -> UnitState { self.unit }

  /// Routes an event to its handler.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` if an install transition fails.
  pub async fn handle(
    &mut self,
    event: Event,
    config: &CharmConfig,
  ) -> Result<Outcome, CharmErrors> {
    debug!("Handling {event} event");
    match event {
      Event::Install => self.on_install(config).await,
      Event::Start => Ok(self.on_start()),
      Event::Stop => Ok(self.on_stop()),
    }
  }

  /// Installs the configured release.
  ///
  /// Without a usable `node-exporter-version` the unit is blocked and the event deferred,
  /// before anything on the host is touched. Otherwise the exporter is installed, its
  /// reported version published, its port opened and the unit marked active.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` if the installer fails or the installed binary cannot report its
  /// version. The unit is left in [`Status::Error`].
  pub async fn on_install(&mut self, config: &CharmConfig) -> Result<Outcome, CharmErrors> {
    self.unit.set_status(Status::Installing);

    let Some(version) = config.version() else {
      info!("No node-exporter-version configured, deferring install");
      self.unit.set_status(Status::Blocked(NEEDS_VERSION.to_string()));
      return Ok(Outcome::Deferred);
    };

    let release = match ExporterRelease::new(version, &config.architecture) {
      Ok(release) => release,
      Err(e) => {
        warn!("Rejecting configured release: {e}");
        self.unit.set_status(Status::Blocked(format!("Invalid node-exporter config: {e}")));
        return Ok(Outcome::Deferred);
      },
    };

    let installed = match self.installer.install(&release).await {
      Ok(()) => self.installer.version(),
      Err(e) => Err(e),
    };
    let workload_version = installed.map_err(|e| self.fail("install", e))?;

    self.unit.set_workload_version(workload_version);
    self.unit.open_port(self.installer.layout().port);
    self.unit.set_status(Status::Active(INSTALLED.to_string()));
    Ok(Outcome::Completed)
  }

  /// Starts the exporter's service.
  ///
  /// The unit ends up active whether or not systemd managed to start the service; a
  /// failure is only logged.
  pub fn on_start(&mut self) -> Outcome {
    self.unit.set_status(Status::Starting);
    if let Err(e) = self.installer.start() {
      error!("Start reported failure, marking active regardless: {e}");
    }
    self.unit.set_status(Status::Active(String::new()));
    Outcome::Completed
  }

  /// Stops and removes the exporter, tolerating every failure along the way.
  pub fn on_stop(&mut self) -> Outcome {
    self.unit.set_status(Status::Stopping);
    match self.installer.uninstall() {
      Ok(report) if report.is_clean() => debug!("Teardown completed cleanly"),
      Ok(report) => warn!("Teardown tolerated failures: {}", report.failures.join(" ")),
      Err(e) => error!("Teardown stopped early: {e}"),
    }
    self.unit.close_port(self.installer.layout().port);
    self.unit.workload_version = None;
    self.unit.set_status(Status::Stopped);
    Outcome::Completed
  }

  /// Marks the unit failed and converts the error.
  fn fail(&mut self, transition: &str, e: ExporterError) -> CharmErrors {
    error!("Failed to {transition} node-exporter: {e}");
    self.unit.set_status(Status::Error(format!("Failed to {transition} node-exporter: {e}")));
    e.into()
  }
}
