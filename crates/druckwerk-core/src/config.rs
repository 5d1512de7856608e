// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// System configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// Settings shared by every printer in a system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Human-readable system name, also used to derive printer UUIDs.
    pub name: String,
    /// Spool directory for job files.
    pub spool_dir: PathBuf,
    /// Multiple printers allowed; each gets its own resource path and an
    /// unlimited active-job count.
    pub multi_queue: bool,
    /// Delay between device-open attempts, in milliseconds.
    pub device_retry_ms: u64,
    /// Delay before completed jobs are cleaned up, in seconds.
    pub clean_delay_secs: u64,
    /// Completed jobs retained per printer.
    pub max_completed_jobs: usize,
    /// Poll interval while waiting for listener threads to exit, in milliseconds.
    pub listener_poll_ms: u64,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            name: "Druckwerk".into(),
            spool_dir: std::env::temp_dir().join("druckwerk"),
            multi_queue: true,
            device_retry_ms: 5_000,
            clean_delay_secs: 60,
            max_completed_jobs: 100,
            listener_poll_ms: 1,
            log_level: "info".into(),
        }
    }
}

impl SystemConfig {
    /// Load configuration from a JSON file; a missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        info!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    pub fn device_retry_interval(&self) -> Duration {
        Duration::from_millis(self.device_retry_ms)
    }

    pub fn clean_delay(&self) -> Duration {
        Duration::from_secs(self.clean_delay_secs)
    }

    pub fn listener_poll_interval(&self) -> Duration {
        Duration::from_millis(self.listener_poll_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = SystemConfig::load(dir.path().join("absent.json")).expect("load");
        assert_eq!(config.device_retry_ms, 5_000);
        assert_eq!(config.max_completed_jobs, 100);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("druckwerk.json");
        std::fs::write(&path, r#"{ "name": "Lab", "device_retry_ms": 250 }"#).expect("write");

        let config = SystemConfig::load(&path).expect("load");
        assert_eq!(config.name, "Lab");
        assert_eq!(config.device_retry_interval(), Duration::from_millis(250));
        assert_eq!(config.clean_delay(), Duration::from_secs(60));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "{ not json").expect("write");
        assert!(SystemConfig::load(&path).is_err());
    }
}
