//! Prometheus scrape jobs advertised to whatever collects from this unit.

use super::*;

/// A target group within a scrape job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticConfig {
  /// `host:port` pairs, where `*` stands for the unit's own address
  pub targets: Vec<String>,
}

/// One Prometheus scrape job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeJob {
  /// Target groups scraped by the job
  pub static_configs: Vec<StaticConfig>,
}

/// The jobs for an exporter listening on `port` on every address of the unit.
pub fn scrape_jobs(port: u16) -> Vec<ScrapeJob> {
  vec![ScrapeJob { static_configs: vec![StaticConfig { targets: vec![format!("*:{port}")] }] }]
}
