//! Host-side operations for installing and removing a Prometheus `node_exporter`.
//!
//! The crate downloads a release archive, unpacks the exporter binary, provisions an
//! unprivileged service identity, writes a systemd unit and its sysconfig file, and
//! hands supervision over to systemd. Teardown is the exact inverse and tolerates
//! failures at every step so that it always makes as much progress as possible.
//!
//! Every host mutation that is not a plain file write goes through the [`HostOps`]
//! capability, and every archive fetch goes through a [`ReleaseSource`]. Both are
//! injected into the [`Installer`] together with an [`InstallLayout`], so the whole
//! lifecycle can be exercised against a scratch directory.
//!
//! # Example
//! ```rust,no_run
//! use node_exporter_ops::{
//!   ExporterRelease, HttpReleaseSource, InstallLayout, Installer, SystemHost,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let installer =
//!     Installer::new(InstallLayout::default(), SystemHost, HttpReleaseSource::default());
//!
//!   installer.install(&ExporterRelease::new("1.7.0", "amd64")?).await?;
//!   println!("Installed node_exporter {}", installer.version()?);
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]
use std::{
  fs,
  path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};
#[cfg(test)] use tracing_test::traced_test;

pub mod errors;
pub mod host;
pub mod installer;
pub mod layout;
pub mod release;
pub mod templates;

pub use errors::ExporterError;
#[cfg(any(test, feature = "test-utils"))]
pub use host::fake::{FakeHost, HostCall};
pub use host::{CommandOutput, FailurePolicy, HostOps, SystemHost};
pub use installer::{parse_version, Installer, UninstallReport};
pub use layout::{ArtifactState, InstallLayout, InstalledArtifact, ServiceIdentity};
pub use release::{
  ExporterRelease, HttpReleaseSource, MirrorReleaseSource, ReleaseOrigin, ReleaseSource,
};
