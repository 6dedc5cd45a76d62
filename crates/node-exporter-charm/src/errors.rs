//! Error types for the node-exporter-charm CLI.
//!
//! Library failures are wrapped transparently so the operator sees the original message,
//! e.g. `Error creating group: 'node_exporter'.` or `release archive not found at ...`.

use thiserror::Error;

/// Errors that can occur while handling a lifecycle event.
#[derive(Error, Debug)]
pub enum CharmErrors {
  /// Errors from installing, starting or querying the exporter
  #[error(transparent)]
  Exporter(#[from] node_exporter_ops::ExporterError),

  /// File system and IO operation errors
  #[error(transparent)]
  IO(#[from] std::io::Error),

  /// Malformed configuration or state files
  #[error(transparent)]
  Json(#[from] serde_json::Error),

  /// The rolling log file could not be opened
  #[error(transparent)]
  LogInit(#[from] tracing_appender::rolling::InitError),
}
