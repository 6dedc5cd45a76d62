//! Shared fixtures for the controller and dispatcher tests.

use std::fs::{self, File};

use flate2::{write::GzEncoder, Compression};
use node_exporter_ops::{
  ExporterRelease, FakeHost, InstallLayout, Installer, MirrorReleaseSource,
};
use tempfile::{tempdir, TempDir};

use super::*;

/// Banner printed by the fake exporter binary.
pub const BANNER: &str = "node_exporter, version 1.7.0 (branch: HEAD, revision: 7333465)";

/// A scratch host root next to a local release mirror.
pub struct Fixture {
  /// Keeps the scratch directory alive
  _root:      TempDir,
  /// Layout rooted inside the scratch directory
  pub layout: InstallLayout,
  /// Directory served by the mirror source
  mirror_at:  PathBuf,
}

impl Fixture {
  /// Creates an empty host root and an empty mirror.
  pub fn new() -> Self {
    let root = tempdir().unwrap();
    let layout = InstallLayout::default().rooted_at(root.path().join("host"));
    let mirror_at = root.path().join("mirror");
    Self { _root: root, layout, mirror_at }
  }

  /// Publishes an amd64 archive for `version` on the mirror.
  pub fn publish(&self, version: &str) {
    let release = ExporterRelease::new(version, "amd64").unwrap();
    let path = self.mirror_at.join(release.download_path());
    fs::create_dir_all(path.parent().unwrap()).unwrap();

    let contents = b"#!/bin/sh\necho node_exporter\n";
    let encoder = GzEncoder::new(File::create(path).unwrap(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mut header = tar::Header::new_gnu();
    header.set_size(contents.len() as u64);
    header.set_mode(0o755);
    header.set_cksum();
    builder.append_data(&mut header, release.binary_in_archive(), &contents[..]).unwrap();
    builder.into_inner().unwrap().finish().unwrap();
  }

  /// A controller on `host` that installs from the mirror, starting from a fresh unit.
  pub fn charm(&self, host: FakeHost) -> NodeExporterCharm<FakeHost, MirrorReleaseSource> {
    host.set_stdout(&self.layout.artifact.binary_path, BANNER);
    let installer =
      Installer::new(self.layout.clone(), host, MirrorReleaseSource::new(&self.mirror_at));
    NodeExporterCharm::new(installer, UnitState::default())
  }
}

/// Configuration asking for `version`.
pub fn configured(version: &str) -> CharmConfig {
  CharmConfig { node_exporter_version: Some(version.to_string()), ..CharmConfig::default() }
}
