//! Well-known locations and identities for an installed exporter.
//!
//! None of these are derived from the release being installed: every version lands in
//! the same places, which is what makes uninstall possible without remembering what was
//! installed. The defaults follow FHS conventions:
//!
//! ```text
//! binary:        /usr/bin/node_exporter
//! service unit:  /etc/systemd/system/node_exporter.service
//! sysconfig:     /etc/sysconfig/node_exporter
//! data dir:      /var/lib/node_exporter
//! textfile dir:  /var/lib/node_exporter/textfile_collector
//! ```

use std::net::{IpAddr, Ipv4Addr};

use super::*;

/// Default TCP port the exporter listens on.
pub const DEFAULT_PORT: u16 = 9100;

/// Default systemd service name.
pub const DEFAULT_SERVICE_NAME: &str = "node_exporter";

/// Default system user and group the exporter runs as.
pub const DEFAULT_IDENTITY: &str = "node_exporter";

/// Accounts the exporter must never run as.
const PRIVILEGED_NAMES: &[&str] = &["root"];

/// The unprivileged OS user and group that own the exporter's data and run its unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceIdentity {
  /// System user name
  pub user:  String,
  /// Primary group of [`ServiceIdentity::user`]
  pub group: String,
}

impl Default for ServiceIdentity {
  fn default() -> Self {
    Self { user: DEFAULT_IDENTITY.to_string(), group: DEFAULT_IDENTITY.to_string() }
  }
}

/// Whether the artifacts of an install are present on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactState {
  /// Every artifact exists.
  Installed,
  /// No artifact exists.
  Absent,
  /// Some but not all artifacts exist, i.e. an install or uninstall was interrupted.
  Partial,
}

/// Filesystem paths created by an install and removed by an uninstall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledArtifact {
  /// The exporter executable
  pub binary_path:       PathBuf,
  /// The systemd unit definition
  pub service_unit_path: PathBuf,
  /// Environment file read by the unit
  pub sysconfig_path:    PathBuf,
  /// Data directory owned by the service identity
  pub data_dir:          PathBuf,
  /// Directory scanned by the textfile collector, inside [`InstalledArtifact::data_dir`]
  pub textfile_dir:      PathBuf,
}

impl Default for InstalledArtifact {
  fn default() -> Self {
    let data_dir = PathBuf::from("/var/lib/node_exporter");
    Self {
      binary_path: PathBuf::from("/usr/bin/node_exporter"),
      service_unit_path: PathBuf::from("/etc/systemd/system/node_exporter.service"),
      sysconfig_path: PathBuf::from("/etc/sysconfig/node_exporter"),
      textfile_dir: data_dir.join("textfile_collector"),
      data_dir,
    }
  }
}

impl InstalledArtifact {
  /// All artifact paths, files first and directories last.
  pub fn paths(&self) -> [&Path; 5] {
    [
      &self.binary_path,
      &self.service_unit_path,
      &self.sysconfig_path,
      &self.data_dir,
      &self.textfile_dir,
    ]
  }

  /// Inspects the filesystem to classify the current install state.
  pub fn state(&self) -> ArtifactState {
    let present = self.paths().iter().filter(|path| path.exists()).count();
    match present {
      0 => ArtifactState::Absent,
      n if n == self.paths().len() => ArtifactState::Installed,
      _ => ArtifactState::Partial,
    }
  }

  /// Re-roots every path under `root`, keeping the absolute layout beneath it.
  pub fn rooted_at(&self, root: &Path) -> Self {
    let reroot = |path: &Path| root.join(path.strip_prefix("/").unwrap_or(path));
    Self {
      binary_path:       reroot(&self.binary_path),
      service_unit_path: reroot(&self.service_unit_path),
      sysconfig_path:    reroot(&self.sysconfig_path),
      data_dir:          reroot(&self.data_dir),
      textfile_dir:      reroot(&self.textfile_dir),
    }
  }
}

/// Everything the [`Installer`](crate::Installer) needs to know about where and how the
/// exporter lives on the host.
///
/// Injected at construction so the whole lifecycle can run against alternate paths and
/// ports without touching process-wide state.
///
/// # Examples
///
/// ```
/// use node_exporter_ops::InstallLayout;
///
/// let layout = InstallLayout::default();
/// assert_eq!(layout.listen_address(), "0.0.0.0:9100");
/// assert_eq!(layout.service_name, "node_exporter");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallLayout {
  /// Paths owned by the install
  pub artifact:     InstalledArtifact,
  /// The account the unit runs as
  pub identity:     ServiceIdentity,
  /// systemd unit name, without the `.service` suffix
  pub service_name: String,
  /// Address the exporter binds to
  pub bind_address: IpAddr,
  /// TCP port the exporter listens on
  pub port:         u16,
}

impl Default for InstallLayout {
  fn default() -> Self {
    Self {
      artifact:     InstalledArtifact::default(),
      identity:     ServiceIdentity::default(),
      service_name: DEFAULT_SERVICE_NAME.to_string(),
      bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
      port:         DEFAULT_PORT,
    }
  }
}

impl InstallLayout {
  /// The `host:port` string passed to `--web.listen-address`.
  pub fn listen_address(&self) -> String { format!("{}:{}", self.bind_address, self.port) }

  /// The unit file name systemd knows the service by.
  pub fn unit_name(&self) -> String { format!("{}.service", self.service_name) }

  /// Returns a copy of this layout with all artifact paths moved under `root`.
  ///
  /// Useful for staging an install into a chroot or a scratch directory.
  pub fn rooted_at(&self, root: impl AsRef<Path>) -> Self {
    Self { artifact: self.artifact.rooted_at(root.as_ref()), ..self.clone() }
  }

  /// Checks the layout's invariants.
  ///
  /// # Errors
  ///
  /// Returns [`ExporterError::InvalidLayout`] if:
  /// - The service identity is empty or privileged
  /// - The service name is empty
  /// - The textfile directory is not inside the data directory
  pub fn validate(&self) -> Result<(), ExporterError> {
    for (kind, name) in [("user", &self.identity.user), ("group", &self.identity.group)] {
      if name.is_empty() {
        return Err(ExporterError::InvalidLayout(format!("service {kind} must not be empty")));
      }
      if PRIVILEGED_NAMES.contains(&name.as_str()) {
        return Err(ExporterError::InvalidLayout(format!(
          "service {kind} must not be privileged, got {name:?}"
        )));
      }
    }
    if self.service_name.is_empty() {
      return Err(ExporterError::InvalidLayout("service name must not be empty".to_string()));
    }
    if !self.artifact.textfile_dir.starts_with(&self.artifact.data_dir) {
      return Err(ExporterError::InvalidLayout(format!(
        "textfile directory {} is outside data directory {}",
        self.artifact.textfile_dir.display(),
        self.artifact.data_dir.display()
      )));
    }
    Ok(())
  }
}
