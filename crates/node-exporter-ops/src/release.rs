//! Identification and retrieval of `node_exporter` release archives.
//!
//! Upstream publishes one gzip'd tarball per version and architecture:
//!
//! ```text
//! {origin}/v{version}/node_exporter-{version}.linux-{arch}.tar.gz
//!   └── node_exporter-{version}.linux-{arch}/node_exporter
//! ```
//!
//! [`ExporterRelease`] computes those names, and a [`ReleaseSource`] fetches the archive to a
//! local file. Two sources are provided: [`HttpReleaseSource`] for the real origin (or any
//! HTTP mirror of it) and [`MirrorReleaseSource`] for a local directory with the same layout,
//! which is what air-gapped hosts use.

use tokio::io::AsyncWriteExt;
use url::Url;

use super::*;

/// Upstream release download origin.
pub const DEFAULT_RELEASE_ORIGIN: &str =
  "https://github.com/prometheus/node_exporter/releases/download";

/// Project name used in archive and directory names.
pub const PROJECT: &str = "node_exporter";

/// Architecture installed when none is configured.
pub const DEFAULT_ARCHITECTURE: &str = "amd64";

/// A specific upstream release for a specific architecture.
///
/// # Examples
///
/// ```
/// use node_exporter_ops::ExporterRelease;
///
/// let release = ExporterRelease::new("v1.7.0", "arm64").unwrap();
/// assert_eq!(release.version, "1.7.0");
/// assert_eq!(release.download_path(), "v1.7.0/node_exporter-1.7.0.linux-arm64.tar.gz");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExporterRelease {
  /// Semantic version without the leading `v`
  pub version:      String,
  /// Release architecture, e.g. `amd64` or `armv7`
  pub architecture: String,
}

impl ExporterRelease {
  /// Builds a release from user-supplied configuration.
  ///
  /// Surrounding whitespace and a single leading `v` are stripped from the version, so
  /// both `1.7.0` and `v1.7.0` select the same archive.
  ///
  /// # Errors
  ///
  /// Returns [`ExporterError::InvalidRelease`] if the version or architecture is empty or
  /// contains characters that would escape the URL path segment.
  pub fn new(version: &str, architecture: &str) -> Result<Self, ExporterError> {
    let trimmed = version.trim();
    let version = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let architecture = architecture.trim();

    let is_valid =
      |s: &str| !s.is_empty() && !s.chars().any(|c| c == '/' || c == '\\' || c.is_whitespace());
    if !is_valid(version) {
      return Err(ExporterError::InvalidRelease(version.to_string()));
    }
    if !is_valid(architecture) {
      return Err(ExporterError::InvalidRelease(format!("{version} ({architecture})")));
    }

    Ok(Self { version: version.to_string(), architecture: architecture.to_string() })
  }

  /// Name of the top-level directory inside the archive, and the archive's file stem.
  pub fn archive_stem(&self) -> String {
    format!("{PROJECT}-{}.linux-{}", self.version, self.architecture)
  }

  /// Path of the archive relative to a release origin.
  pub fn download_path(&self) -> String {
    format!("v{}/{}.tar.gz", self.version, self.archive_stem())
  }

  /// Full download URL against the given origin.
  ///
  /// # Errors
  ///
  /// Returns [`ExporterError::InvalidUrl`] if `origin` is not a valid base URL.
  pub fn download_url(&self, origin: &str) -> Result<Url, ExporterError> {
    Ok(Url::parse(&format!("{}/{}", origin.trim_end_matches('/'), self.download_path()))?)
  }

  /// Location of the exporter binary relative to the unpacked archive root.
  pub fn binary_in_archive(&self) -> PathBuf { Path::new(&self.archive_stem()).join(PROJECT) }
}

/// Anything that can materialize a release archive on local disk.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
  /// Writes the archive for `release` to `dest`, replacing its contents.
  ///
  /// # Errors
  ///
  /// Returns an error if the archive cannot be retrieved or written.
  async fn fetch(&self, release: &ExporterRelease, dest: &Path) -> Result<(), ExporterError>;
}

/// Downloads release archives over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpReleaseSource {
  /// Internal web client used for all downloads.
  client: reqwest::Client,
  /// Base URL the download path is appended to.
  origin: String,
}

impl HttpReleaseSource {
  /// Creates a source that downloads from `origin` instead of upstream.
  pub fn new(origin: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), origin: origin.into() }
  }

  /// The base URL archives are downloaded from.
  pub fn origin(&self) -> &str { &self.origin }
}

impl Default for HttpReleaseSource {
  fn default() -> Self { Self::new(DEFAULT_RELEASE_ORIGIN) }
}

impl ReleaseSource for HttpReleaseSource {
  async fn fetch(&self, release: &ExporterRelease, dest: &Path) -> Result<(), ExporterError> {
    let url = release.download_url(&self.origin)?;
    debug!("Downloading {url}");

    let download_error = |source| ExporterError::Download { url: url.to_string(), source };
    let mut response = self
      .client
      .get(url.clone())
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(download_error)?;
    trace!("Release origin response: {response:?}");

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0usize;
    while let Some(chunk) = response.chunk().await.map_err(download_error)? {
      file.write_all(&chunk).await?;
      written += chunk.len();
    }
    file.flush().await?;

    debug!("Downloaded {written} bytes to {}", dest.display());
    Ok(())
  }
}

/// Serves release archives from a local directory laid out like the upstream origin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorReleaseSource {
  /// Directory that contains `v{version}/...tar.gz` entries.
  root: PathBuf,
}

impl MirrorReleaseSource {
  /// Creates a source rooted at `root`.
  pub fn new(root: impl Into<PathBuf>) -> Self { Self { root: root.into() } }

  /// Where the archive for `release` is expected to be.
  pub fn archive_path(&self, release: &ExporterRelease) -> PathBuf {
    self.root.join(release.download_path())
  }
}

impl ReleaseSource for MirrorReleaseSource {
  async fn fetch(&self, release: &ExporterRelease, dest: &Path) -> Result<(), ExporterError> {
    let source = self.archive_path(release);
    if !source.is_file() {
      return Err(ExporterError::ReleaseNotFound(source));
    }

    debug!("Copying {} from mirror", source.display());
    tokio::fs::copy(&source, dest).await?;
    Ok(())
  }
}

/// A release source chosen at runtime from configuration.
#[derive(Debug, Clone)]
pub enum ReleaseOrigin {
  /// Any `http://` or `https://` origin
  Http(HttpReleaseSource),
  /// A local directory, given as a path or a `file://` URL
  Mirror(MirrorReleaseSource),
}

impl ReleaseOrigin {
  /// Interprets a configured origin string.
  ///
  /// # Errors
  ///
  /// Returns [`ExporterError::InvalidUrl`] if `origin` looks like a URL but cannot be
  /// parsed, or is a `file://` URL that does not name a local path.
  ///
  /// # Examples
  ///
  /// ```
  /// use node_exporter_ops::ReleaseOrigin;
  ///
  /// assert!(matches!(ReleaseOrigin::parse("https://mirror.internal/ne").unwrap(), ReleaseOrigin::Http(_)));
  /// assert!(matches!(ReleaseOrigin::parse("/srv/mirror").unwrap(), ReleaseOrigin::Mirror(_)));
  /// ```
  pub fn parse(origin: &str) -> Result<Self, ExporterError> {
    if origin.starts_with("http://") || origin.starts_with("https://") {
      Url::parse(origin)?;
      return Ok(ReleaseOrigin::Http(HttpReleaseSource::new(origin)));
    }
    if origin.starts_with("file://") {
      let path = Url::parse(origin)?
        .to_file_path()
        .map_err(|()| ExporterError::InvalidUrl(url::ParseError::RelativeUrlWithoutBase))?;
      return Ok(ReleaseOrigin::Mirror(MirrorReleaseSource::new(path)));
    }
    Ok(ReleaseOrigin::Mirror(MirrorReleaseSource::new(origin)))
  }
}

impl Default for ReleaseOrigin {
  fn default() -> Self { ReleaseOrigin::Http(HttpReleaseSource::default()) }
}

impl ReleaseSource for ReleaseOrigin {
  async fn fetch(&self, release: &ExporterRelease, dest: &Path) -> Result<(), ExporterError> {
    match self {
      ReleaseOrigin::Http(source) => source.fetch(release, dest).await,
      ReleaseOrigin::Mirror(source) => source.fetch(release, dest).await,
    }
  }
}
