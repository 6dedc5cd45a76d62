//! Install, start, query and remove the exporter.
//!
//! The [`Installer`] holds no state about the host beyond its injected [`InstallLayout`]:
//! every operation inspects and mutates the host directly, so any operation can run in a
//! fresh process after any other.
//!
//! Failure handling is deliberately asymmetric:
//! - [`Installer::install`] is fail-fast. Fetch errors propagate as they are, and a failed
//!   account or unit step is logged and raised as [`ExporterError::Operational`]. Nothing is
//!   rolled back.
//! - [`Installer::uninstall`] is fail-soft. Every step is attempted whatever happened before
//!   it, and tolerated failures are collected in an [`UninstallReport`].
//!
//! Both behaviours are [`FailurePolicy`] values on the installer and can be swapped.

use std::{fs::File, io};

use flate2::read::GzDecoder;
use tar::Archive;

use super::*;

/// Prefix for scratch files and directories created during install.
const SCRATCH_PREFIX: &str = "node-exporter";

/// Failures that were tolerated while tearing down an install.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallReport {
  /// The fixed message of every step that failed, in order
  pub failures: Vec<String>,
}

impl UninstallReport {
  /// Whether every teardown step succeeded.
  pub fn is_clean(&self) -> bool { self.failures.is_empty() }
}

/// Drives the exporter lifecycle on a host.
///
/// # Examples
///
/// ```no_run
/// use node_exporter_ops::{ExporterRelease, InstallLayout, Installer, ReleaseOrigin, SystemHost};
///
/// # async fn example() -> Result<(), node_exporter_ops::ExporterError> {
/// let origin = ReleaseOrigin::parse("/srv/mirror/node_exporter")?;
/// let installer = Installer::new(InstallLayout::default(), SystemHost, origin);
///
/// installer.install(&ExporterRelease::new("1.7.0", "amd64")?).await?;
/// installer.start()?;
///
/// let report = installer.uninstall()?;
/// assert!(report.is_clean());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Installer<H, R> {
  /// Where everything lives
  layout:          InstallLayout,
  /// Performs host mutations
  host:            H,
  /// Provides release archives
  source:          R,
  /// How install reacts to a failed host step
  install_policy:  FailurePolicy,
  /// How uninstall reacts to a failed step
  teardown_policy: FailurePolicy,
}

impl<H: HostOps, R: ReleaseSource> Installer<H, R> {
  /// Creates an installer with fail-fast install and fail-soft teardown.
  pub fn new(layout: InstallLayout, host: H, source: R) -> Self {
    Self {
      layout,
      host,
      source,
      install_policy: FailurePolicy::Abort,
      teardown_policy: FailurePolicy::Continue,
    }
  }

  /// Overrides how install and uninstall react to failed host steps.
  pub fn with_policies(mut self, install: FailurePolicy, teardown: FailurePolicy) -> Self {
    self.install_policy = install;
    self.teardown_policy = teardown;
    self
  }

  /// The layout this installer manages.
  pub fn layout(&self) -> &InstallLayout { &self.layout }

  /// The host this installer mutates.
  pub fn host(&self) -> &H { &self.host }

  /// Installs `release`, leaving the unit enabled but not started.
  ///
  /// Steps, in order:
  /// 1. Fetch the release archive into a scratch file
  /// 2. Unpack it into a scratch directory and copy the binary into place
  /// 3. Create the service group and system user
  /// 4. Write the systemd unit, reload systemd and enable the unit
  /// 5. Create the data and textfile directories and hand them to the service identity
  /// 6. Render the sysconfig file
  ///
  /// Scratch files and directories are removed on every exit path.
  ///
  /// # Errors
  ///
  /// Returns:
  /// - [`ExporterError::InvalidLayout`] before touching anything if the layout is invalid
  /// - Fetch errors ([`ExporterError::is_fetch_error`]) as reported by the release source
  /// - [`ExporterError::ArchiveEntryMissing`] if the archive lacks the binary
  /// - [`ExporterError::Operational`] if an account or unit step fails
  /// - [`ExporterError::Io`] for any failed file operation
  pub async fn install(&self, release: &ExporterRelease) -> Result<(), ExporterError> {
    self.layout.validate()?;
    info!("Installing node_exporter {} ({})", release.version, release.architecture);

    let archive = tempfile::Builder::new().prefix(SCRATCH_PREFIX).suffix(".tar.gz").tempfile()?;
    self.source.fetch(release, archive.path()).await?;
    self.install_binary(release, archive.path())?;
    archive.close()?;

    self.provision_identity()?;
    self.install_service_unit()?;
    self.prepare_data_dirs()?;
    self.render_sysconfig()?;

    info!("node_exporter {} installed", release.version);
    Ok(())
  }

  /// Unpacks `archive` and copies the exporter binary to its final location.
  fn install_binary(
    &self,
    release: &ExporterRelease,
    archive: &Path,
  ) -> Result<(), ExporterError> {
    let scratch = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempdir()?;
    debug!("Extracting {} to {}", archive.display(), scratch.path().display());
    Archive::new(GzDecoder::new(File::open(archive)?)).unpack(scratch.path())?;

    let source = scratch.path().join(release.binary_in_archive());
    if !source.is_file() {
      return Err(ExporterError::ArchiveEntryMissing(release.binary_in_archive()));
    }

    let target = &self.layout.artifact.binary_path;
    let parent = target.parent().unwrap_or_else(|| Path::new("/"));
    fs::create_dir_all(parent)?;

    // Staged next to the target and renamed over it, so a running binary is replaced
    // rather than rewritten in place. The staged file is removed if any step fails.
    let mut staged = tempfile::Builder::new().prefix(SCRATCH_PREFIX).tempfile_in(parent)?;
    debug!("Copying {} to {}", source.display(), target.display());
    io::copy(&mut File::open(&source)?, staged.as_file_mut())?;
    staged.as_file().set_permissions(fs::metadata(&source)?.permissions())?;
    match fs::metadata(&source).and_then(|m| m.modified()) {
      Ok(modified) => staged.as_file().set_modified(modified)?,
      Err(e) => warn!("Not preserving modification time of {}: {e}", source.display()),
    }
    staged.persist(target).map_err(|e| e.error)?;
    Ok(())
  }

  /// Creates the service group, then the system user in it.
  fn provision_identity(&self) -> Result<(), ExporterError> {
    let identity = &self.layout.identity;

    debug!("Creating '{}' group", identity.group);
    self
      .install_policy
      .check(self.host.create_group(&identity.group), &format!(
        "Error creating group: '{}'.",
        identity.group
      ))?;

    debug!("Creating '{}' user", identity.user);
    self
      .install_policy
      .check(self.host.create_system_user(identity), &format!(
        "Error creating user: '{}'.",
        identity.user
      ))?;
    Ok(())
  }

  /// Writes the unit file, then reloads systemd and enables the unit.
  fn install_service_unit(&self) -> Result<(), ExporterError> {
    let unit_path = &self.layout.artifact.service_unit_path;
    debug!("Writing systemd unit {}", unit_path.display());
    if let Some(parent) = unit_path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(unit_path, templates::render_service_unit(&self.layout))?;

    let message = format!("Error creating node_exporter service: '{}'.", self.layout.service_name);
    let result =
      self.host.daemon_reload().and_then(|()| self.host.enable_service(&self.layout.unit_name()));
    self.install_policy.check(result, &message)?;
    Ok(())
  }

  /// Creates the data and textfile directories and hands both to the service identity.
  fn prepare_data_dirs(&self) -> Result<(), ExporterError> {
    let artifact = &self.layout.artifact;
    fs::create_dir_all(&artifact.textfile_dir)?;

    for dir in [&artifact.data_dir, &artifact.textfile_dir] {
      self.install_policy.check(
        self.host.chown(dir, &self.layout.identity),
        &format!("Error changing owner of {}.", dir.display()),
      )?;
    }
    Ok(())
  }

  /// Writes the sysconfig file, replacing any previous one.
  fn render_sysconfig(&self) -> Result<(), ExporterError> {
    let path = &self.layout.artifact.sysconfig_path;
    debug!("Writing sysconfig file {}", path.display());
    if let Some(parent) = path.parent() {
      fs::create_dir_all(parent)?;
    }
    fs::write(path, templates::render_sysconfig(&self.layout))?;
    Ok(())
  }

  /// Starts the exporter's unit.
  ///
  /// # Errors
  ///
  /// Returns [`ExporterError::Operational`] with a fixed message if systemd reports failure.
  pub fn start(&self) -> Result<(), ExporterError> {
    info!("Starting node_exporter");
    let started = self.host.start_service(&self.layout.service_name);
    FailurePolicy::Abort.check(started, "Error starting node exporter.")?;
    Ok(())
  }

  /// Stops and removes everything [`Installer::install`] created.
  ///
  /// Under the default fail-soft policy this never returns an error: each failed step is
  /// logged, recorded in the report, and the next step runs anyway.
  ///
  /// # Errors
  ///
  /// Only under a [`FailurePolicy::Abort`] teardown policy, returns
  /// [`ExporterError::Operational`] for the first failed step.
  pub fn uninstall(&self) -> Result<UninstallReport, ExporterError> {
    info!("Uninstalling node_exporter");
    let mut report = UninstallReport::default();
    let service = &self.layout.service_name;
    let artifact = &self.layout.artifact;

    let stopped = self.host.stop_service(service);
    let disabled = self.host.disable_service(service);
    self.tolerate(&mut report, stopped.and(disabled), "Error stopping node exporter.")?;

    for path in [&artifact.binary_path, &artifact.service_unit_path, &artifact.sysconfig_path] {
      if path.exists() {
        debug!("Removing {}", path.display());
        self.tolerate(
          &mut report,
          fs::remove_file(path).map_err(ExporterError::from),
          &format!("Error removing {}.", path.display()),
        )?;
      }
    }

    if artifact.data_dir.exists() {
      debug!("Removing {}", artifact.data_dir.display());
      self.tolerate(
        &mut report,
        fs::remove_dir_all(&artifact.data_dir).map_err(ExporterError::from),
        &format!("Error removing {}.", artifact.data_dir.display()),
      )?;
    }

    self.tolerate(&mut report, self.host.daemon_reload(), "Error reloading systemd units.")?;

    let identity = &self.layout.identity;
    let user_removed = self.host.delete_user(&identity.user);
    let group_removed = self.host.delete_group(&identity.group);
    self.tolerate(
      &mut report,
      user_removed.and(group_removed),
      "Error removing node exporter user and group.",
    )?;

    if report.is_clean() {
      info!("node_exporter uninstalled");
    } else {
      warn!("node_exporter uninstalled with {} tolerated failure(s)", report.failures.len());
    }
    Ok(report)
  }

  /// Applies the teardown policy to one step, recording it if it failed.
  fn tolerate(
    &self,
    report: &mut UninstallReport,
    result: Result<(), ExporterError>,
    message: &str,
  ) -> Result<(), ExporterError> {
    if !self.teardown_policy.check(result, message)? {
      report.failures.push(message.to_string());
    }
    Ok(())
  }

  /// Asks the installed binary for its version.
  ///
  /// # Errors
  ///
  /// Returns:
  /// - [`ExporterError::Operational`] if the binary is missing or exits unsuccessfully
  /// - [`ExporterError::VersionParse`] if the output does not look like a version banner
  pub fn version(&self) -> Result<String, ExporterError> {
    const MESSAGE: &str = "Error getting node_exporter version.";

    let output = match self.host.run(&self.layout.artifact.binary_path, &["--version"]) {
      Ok(output) if output.success() => output,
      Ok(output) => {
        error!("{MESSAGE} (exit code {:?}: {})", output.code, output.stderr.trim());
        return Err(ExporterError::Operational(MESSAGE.to_string()));
      },
      Err(e) => {
        error!("{MESSAGE} ({e})");
        return Err(ExporterError::Operational(MESSAGE.to_string()));
      },
    };

    // Older releases print the banner on stderr.
    let banner = if output.stdout.trim().is_empty() { &output.stderr } else { &output.stdout };
    parse_version(banner)
  }
}

/// Extracts the version from `node_exporter --version` output.
///
/// The banner has the shape `node_exporter, version <semver> (branch: ..., revision: ...)`,
/// so the version is the third whitespace-separated token.
///
/// # Errors
///
/// Returns [`ExporterError::VersionParse`] if the output has fewer than three tokens.
///
/// # Examples
///
/// ```
/// use node_exporter_ops::parse_version;
///
/// let banner = "node_exporter, version 1.7.0 (branch: HEAD, revision: 7333465)";
/// assert_eq!(parse_version(banner).unwrap(), "1.7.0");
/// assert!(parse_version("node_exporter").is_err());
/// ```
pub fn parse_version(output: &str) -> Result<String, ExporterError> {
  output
    .split_whitespace()
    .nth(2)
    .map(str::to_string)
    .ok_or_else(|| ExporterError::VersionParse(output.trim().to_string()))
}

#[cfg(test)]
mod tests {
  use flate2::{write::GzEncoder, Compression};
  use tempfile::{tempdir, TempDir};

  use super::*;

  const BANNER: &str = "node_exporter, version 1.7.0 (branch: HEAD, revision: 7333465)\n  build \
                        user:       root@35918982f6d8\n";

  /// A scratch host root with a mirror that serves one release.
  struct Fixture {
    _root:     TempDir,
    layout:    InstallLayout,
    mirror:    MirrorReleaseSource,
    mirror_at: PathBuf,
  }

  impl Fixture {
    fn new() -> Self {
      let root = tempdir().unwrap();
      let layout = InstallLayout::default().rooted_at(root.path().join("host"));
      let mirror_at = root.path().join("mirror");
      Self { mirror: MirrorReleaseSource::new(&mirror_at), _root: root, layout, mirror_at }
    }

    /// Publishes a release archive whose binary contains `contents`.
    fn publish(&self, release: &ExporterRelease, binary_name: &str, contents: &[u8]) {
      let path = self.mirror_at.join(release.download_path());
      fs::create_dir_all(path.parent().unwrap()).unwrap();

      let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
      let mut builder = tar::Builder::new(encoder);
      let mut header = tar::Header::new_gnu();
      header.set_size(contents.len() as u64);
      header.set_mode(0o755);
      header.set_cksum();
      builder
        .append_data(&mut header, Path::new(&release.archive_stem()).join(binary_name), contents)
        .unwrap();
      builder.into_inner().unwrap().finish().unwrap();
    }

    fn installer(&self, host: FakeHost) -> Installer<FakeHost, MirrorReleaseSource> {
      host.set_stdout(&self.layout.artifact.binary_path, BANNER);
      Installer::new(self.layout.clone(), host, self.mirror.clone())
    }
  }

  fn entries(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fs::read_dir(dir)?.map(|entry| entry.map(|e| e.path())).collect()
  }

  fn release() -> ExporterRelease { ExporterRelease::new("1.7.0", "amd64").unwrap() }

  #[traced_test]
  #[tokio::test]
  async fn test_install_materializes_every_artifact() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"#!/bin/sh\necho exporter\n");
    let installer = fixture.installer(FakeHost::new());

    installer.install(&release()).await?;

    let artifact = &fixture.layout.artifact;
    assert_eq!(artifact.state(), ArtifactState::Installed);
    assert_eq!(fs::read(&artifact.binary_path)?, b"#!/bin/sh\necho exporter\n");
    assert_eq!(
      fs::read_to_string(&artifact.sysconfig_path)?,
      format!(
        "OPTIONS=\"--web.listen-address=0.0.0.0:9100 --collector.textfile.directory={}\"\n",
        artifact.textfile_dir.display()
      )
    );
    assert!(fs::read_to_string(&artifact.service_unit_path)?.contains("User=node_exporter"));

    let host = installer.host();
    assert!(host.has_group("node_exporter"));
    assert!(host.has_user("node_exporter"));
    assert!(host.is_enabled("node_exporter.service"));
    assert!(!host.is_running("node_exporter"));
    assert_eq!(host.daemon_reloads(), 1);
    assert_eq!(host.owner_of(&artifact.data_dir), Some(ServiceIdentity::default()));
    assert_eq!(host.owner_of(&artifact.textfile_dir), Some(ServiceIdentity::default()));
    Ok(())
  }

  #[cfg(unix)]
  #[tokio::test]
  async fn test_install_preserves_executable_bit() -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let installer = fixture.installer(FakeHost::new());
    installer.install(&release()).await?;

    let mode = fs::metadata(&fixture.layout.artifact.binary_path)?.permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    Ok(())
  }

  #[tokio::test]
  async fn test_install_overwrites_previous_sysconfig() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let sysconfig = &fixture.layout.artifact.sysconfig_path;
    fs::create_dir_all(sysconfig.parent().unwrap())?;
    fs::write(sysconfig, "OPTIONS=\"--stale\"\n")?;

    fixture.installer(FakeHost::new()).install(&release()).await?;
    assert!(!fs::read_to_string(sysconfig)?.contains("--stale"));
    Ok(())
  }

  #[tokio::test]
  async fn test_install_fetch_failure_touches_nothing() {
    let fixture = Fixture::new();
    let installer = fixture.installer(FakeHost::new());

    let err = installer.install(&release()).await.unwrap_err();
    assert!(err.is_fetch_error());
    assert_eq!(fixture.layout.artifact.state(), ArtifactState::Absent);
    assert!(installer.host().calls().is_empty());
  }

  #[tokio::test]
  async fn test_install_leaves_no_staged_binary() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let installer = fixture.installer(FakeHost::new());
    let binary = &fixture.layout.artifact.binary_path;
    let bin_dir = binary.parent().unwrap();

    installer.install(&release()).await?;
    assert_eq!(entries(bin_dir)?, vec![binary.clone()]);

    // A directory in the way makes the final rename fail.
    fs::remove_file(binary)?;
    fs::create_dir_all(binary.join("occupied"))?;
    assert!(matches!(installer.install(&release()).await, Err(ExporterError::Io(_))));
    assert_eq!(entries(bin_dir)?, vec![binary.clone()]);
    Ok(())
  }

  #[tokio::test]
  async fn test_reinstall_over_existing_install() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let installer = fixture.installer(FakeHost::new());

    installer.install(&release()).await?;
    installer.install(&release()).await?;

    let host = installer.host();
    assert_eq!(fixture.layout.artifact.state(), ArtifactState::Installed);
    assert!(host.has_user("node_exporter"));
    assert!(host.has_group("node_exporter"));
    assert_eq!(host.calls().iter().filter(|c| matches!(c, HostCall::CreateGroup(_))).count(), 2);
    assert_eq!(host.daemon_reloads(), 2);
    Ok(())
  }

  #[tokio::test]
  async fn test_install_archive_without_binary() {
    let fixture = Fixture::new();
    fixture.publish(&release(), "README.md", b"docs");
    let installer = fixture.installer(FakeHost::new());

    let err = installer.install(&release()).await.unwrap_err();
    assert!(matches!(err, ExporterError::ArchiveEntryMissing(path) if path.ends_with("node_exporter")));
  }

  #[traced_test]
  #[tokio::test]
  async fn test_install_group_failure_is_fatal() {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let host = FakeHost::new();
    host.fail_on(HostCall::CreateGroup(String::new()));
    let installer = fixture.installer(host);

    let err = installer.install(&release()).await.unwrap_err();
    assert!(
      matches!(err, ExporterError::Operational(ref msg) if msg == "Error creating group: 'node_exporter'.")
    );
    assert!(logs_contain("Error creating group: 'node_exporter'."));
    // No rollback: the binary copied before the failure stays in place.
    assert_eq!(fixture.layout.artifact.state(), ArtifactState::Partial);
    assert!(!installer.host().calls().contains(&HostCall::DaemonReload));
  }

  #[tokio::test]
  async fn test_install_enable_failure_is_fatal() {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let host = FakeHost::new();
    host.fail_on(HostCall::EnableService(String::new()));
    let installer = fixture.installer(host);

    let err = installer.install(&release()).await.unwrap_err();
    assert!(
      matches!(err, ExporterError::Operational(ref msg) if msg == "Error creating node_exporter service: 'node_exporter'.")
    );
    assert!(!fixture.layout.artifact.sysconfig_path.exists());
  }

  #[tokio::test]
  async fn test_install_rejects_privileged_layout() {
    let fixture = Fixture::new();
    let mut layout = fixture.layout.clone();
    layout.identity.user = "root".into();
    let installer = Installer::new(layout, FakeHost::new(), fixture.mirror.clone());

    assert!(matches!(
      installer.install(&release()).await,
      Err(ExporterError::InvalidLayout(_))
    ));
  }

  #[test]
  fn test_start_failure_is_typed() {
    let fixture = Fixture::new();
    let host = FakeHost::new();
    host.fail_on(HostCall::StartService(String::new()));
    let installer = fixture.installer(host);

    assert!(
      matches!(installer.start(), Err(ExporterError::Operational(msg)) if msg == "Error starting node exporter.")
    );
    assert!(fixture.installer(FakeHost::new()).start().is_ok());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_uninstall_proceeds_when_systemd_fails() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let host = FakeHost::new();
    let installer = fixture.installer(host);
    installer.install(&release()).await?;
    fs::write(fixture.layout.artifact.textfile_dir.join("custom.prom"), "up 1\n")?;

    installer.host().fail_on(HostCall::StopService(String::new()));
    installer.host().fail_on(HostCall::DisableService(String::new()));
    let report = installer.uninstall()?;

    assert_eq!(report.failures, vec!["Error stopping node exporter.".to_string()]);
    assert!(logs_contain("Error stopping node exporter."));
    assert_eq!(fixture.layout.artifact.state(), ArtifactState::Absent);
    assert!(!installer.host().has_user("node_exporter"));
    assert!(!installer.host().has_group("node_exporter"));
    Ok(())
  }

  #[test]
  fn test_uninstall_on_clean_host_only_reports_account_removal() {
    let fixture = Fixture::new();
    let installer = fixture.installer(FakeHost::new());

    let report = installer.uninstall().unwrap();
    assert_eq!(report.failures, vec!["Error removing node exporter user and group.".to_string()]);
    assert_eq!(fixture.layout.artifact.state(), ArtifactState::Absent);
  }

  #[tokio::test]
  async fn test_uninstall_with_abort_policy_stops_early() -> anyhow::Result<()> {
    let fixture = Fixture::new();
    fixture.publish(&release(), "node_exporter", b"binary");
    let installer = fixture
      .installer(FakeHost::new())
      .with_policies(FailurePolicy::Abort, FailurePolicy::Abort);
    installer.install(&release()).await?;

    installer.host().fail_on(HostCall::StopService(String::new()));
    assert!(matches!(installer.uninstall(), Err(ExporterError::Operational(_))));
    assert_eq!(fixture.layout.artifact.state(), ArtifactState::Installed);
    Ok(())
  }

  #[test]
  fn test_version_from_mocked_output() {
    let fixture = Fixture::new();
    let installer = fixture.installer(FakeHost::new());
    let banner = "node_exporter, version 1.7.0 (branch: HEAD...)";
    installer.host().set_stdout(&fixture.layout.artifact.binary_path, banner);
    assert_eq!(installer.version().unwrap(), "1.7.0");
  }

  #[test]
  fn test_version_reads_stderr_banner() {
    let fixture = Fixture::new();
    let installer = fixture.installer(FakeHost::new());
    installer.host().set_output(&fixture.layout.artifact.binary_path, CommandOutput {
      code:   Some(0),
      stdout: String::new(),
      stderr: BANNER.to_string(),
    });
    assert_eq!(installer.version().unwrap(), "1.7.0");
  }

  #[test]
  fn test_version_failures() {
    let fixture = Fixture::new();
    let missing = Installer::new(fixture.layout.clone(), FakeHost::new(), fixture.mirror.clone());
    assert!(matches!(missing.version(), Err(ExporterError::Operational(_))));

    let installer = fixture.installer(FakeHost::new());
    installer.host().set_output(&fixture.layout.artifact.binary_path, CommandOutput {
      code:   Some(2),
      stdout: String::new(),
      stderr: "flag provided but not defined".into(),
    });
    assert!(matches!(installer.version(), Err(ExporterError::Operational(_))));

    installer.host().set_stdout(&fixture.layout.artifact.binary_path, "node_exporter 1.7.0");
    assert!(matches!(installer.version(), Err(ExporterError::VersionParse(_))));
  }
}
