//! Charm configuration.
//!
//! The orchestration framework owns configuration; this process only reads it. Values are
//! layered, lowest precedence first:
//! 1. A JSON file passed with `--config`
//! 2. The `NODE_EXPORTER_VERSION` environment variable
//! 3. Command line flags
//!
//! ```json
//! { "node-exporter-version": "1.7.0", "architecture": "arm64" }
//! ```

use std::path::Path;

use node_exporter_ops::release::DEFAULT_ARCHITECTURE;

use super::*;

/// Configuration recognised by the charm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CharmConfig {
  /// Release to install; install blocks until this is set
  #[serde(default)]
  pub node_exporter_version: Option<String>,
  /// Release architecture
  #[serde(default = "default_architecture")]
  pub architecture:          String,
  /// Alternative release origin: an HTTP(S) base URL or a local mirror directory
  #[serde(default)]
  pub release_origin:        Option<String>,
}

/// Architecture used when the configuration names none.
fn default_architecture() -> String { DEFAULT_ARCHITECTURE.to_string() }

impl Default for CharmConfig {
  fn default() -> Self {
    Self {
      node_exporter_version: None,
      architecture:          default_architecture(),
      release_origin:        None,
    }
  }
}

impl CharmConfig {
  /// Reads configuration from a JSON file.
  ///
  /// # Errors
  ///
  /// Returns `CharmErrors` if the file cannot be read or is not valid configuration.
  pub fn load(path: &Path) -> Result<Self, CharmErrors> {
    trace!("Loading config from {}", path.display());
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
  }

  /// Applies higher-precedence values on top of this configuration.
  pub fn with_overrides(
    mut self,
    version: Option<String>,
    architecture: Option<String>,
    release_origin: Option<String>,
  ) -> Self {
    if version.is_some() {
      self.node_exporter_version = version;
    }
    if let Some(architecture) = architecture {
      self.architecture = architecture;
    }
    if release_origin.is_some() {
      self.release_origin = release_origin;
    }
    self
  }

  /// The configured version, if it is present and not blank.
  pub fn version(&self) -> Option<&str> {
    self.node_exporter_version.as_deref().map(str::trim).filter(|v| !v.is_empty())
  }
}
