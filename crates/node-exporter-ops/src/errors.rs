//! Error types for the node-exporter-ops library.
//!
//! The variants fall into the three groups the lifecycle cares about:
//! - Fetch failures ([`ExporterError::Download`], [`ExporterError::ReleaseNotFound`]), which abort
//!   an install before any host mutation happens
//! - Typed operational failures ([`ExporterError::Operational`]), raised with a fixed message once
//!   a host step has failed under [`FailurePolicy::Abort`](crate::FailurePolicy::Abort)
//! - Low level failures (IO, command exit codes) that the installer either wraps or tolerates
//!
//! # Examples
//!
//! ```
//! use node_exporter_ops::{ExporterError, ExporterRelease};
//!
//! match ExporterRelease::new("", "amd64") {
//!   Err(ExporterError::InvalidRelease(version)) => assert!(version.is_empty()),
//!   _ => unreachable!(),
//! }
//! ```

use thiserror::Error;

use super::*;

/// Errors that can occur while installing, querying or removing the exporter.
#[derive(Error, Debug)]
pub enum ExporterError {
  /// The release origin was unreachable or answered with a non-success status.
  #[error("failed to download {url}: {source}")]
  Download {
    /// The URL that was requested
    url:    String,
    /// The underlying HTTP client error
    #[source]
    source: reqwest::Error,
  },

  /// A mirror directory does not contain the requested release archive.
  #[error("release archive not found at {0}")]
  ReleaseNotFound(PathBuf),

  /// The archive was unpacked but did not contain the exporter binary where expected.
  #[error("archive does not contain {0}")]
  ArchiveEntryMissing(PathBuf),

  /// The requested version string cannot identify a release.
  #[error("invalid node_exporter version: {0:?}")]
  InvalidRelease(String),

  /// The install layout would violate an invariant (e.g. run the unit as root).
  #[error("invalid install layout: {0}")]
  InvalidLayout(String),

  /// A host command ran but exited unsuccessfully.
  #[error("`{command}` exited with {}", code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}")))]
  Command {
    /// The command line that was executed
    command: String,
    /// Exit code, `None` when the process was killed by a signal
    code:    Option<i32>,
  },

  /// A lifecycle step failed; carries the fixed, operator-facing message.
  #[error("{0}")]
  Operational(String),

  /// The exporter's `--version` output did not have the expected shape.
  #[error("unexpected node_exporter version output: {0:?}")]
  VersionParse(String),

  /// A user or group name could not be resolved on the host.
  #[error("unknown {kind} {name:?}")]
  UnknownIdentity {
    /// Either `"user"` or `"group"`
    kind: &'static str,
    /// The name that failed to resolve
    name: String,
  },

  /// A system call made through `nix` failed.
  #[error(transparent)]
  Errno(#[from] nix::errno::Errno),

  /// Failed to parse a release origin URL.
  #[error(transparent)]
  InvalidUrl(#[from] url::ParseError),

  /// A file system operation failed.
  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl ExporterError {
  /// Checks whether this error happened while fetching the release archive.
  ///
  /// Fetch failures leave the host untouched, so callers may safely retry them.
  pub fn is_fetch_error(&self) -> bool {
    matches!(self, ExporterError::Download { .. } | ExporterError::ReleaseNotFound(_))
  }
}
