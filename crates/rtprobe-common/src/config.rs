//! Configuration structures for the rtprobe run.
//!
//! Supports TOML deserialization with sensible defaults that mirror a
//! typical 1 kHz control-loop demonstration: 1 ms period, 1000 cycles,
//! SCHED_FIFO priority 80 on an isolated CPU.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level run configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Period of the measured task.
    #[serde(with = "humantime_serde")]
    pub period: Duration,

    /// Number of periodic cycles to execute.
    pub iterations: u32,

    /// Real-time configuration.
    pub realtime: RealtimeConfig,

    /// Report rendering configuration.
    pub report: ReportConfig,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(1),
            iterations: 1000,
            realtime: RealtimeConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

/// Real-time scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Enable real-time setup (requires privileges).
    pub enabled: bool,

    /// Scheduler policy: "fifo" or "rr" (round-robin).
    pub policy: SchedPolicy,

    /// Scheduler priority (1-99 for RT policies). 80 leaves headroom above
    /// user tasks while staying below critical kernel RT threads.
    pub priority: u8,

    /// CPU to pin the measuring thread to, intended to be a core excluded
    /// from the general scheduler (e.g. isolcpus). `None` leaves placement
    /// to the OS.
    pub cpu: Option<usize>,

    /// Lock all memory pages (mlockall).
    pub lock_memory: bool,

    /// Fail immediately at startup if RT requirements cannot be met.
    /// When true, configuration returns an error if CAP_SYS_NICE or
    /// CAP_IPC_LOCK equivalents are not available.
    pub fail_fast: bool,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            policy: SchedPolicy::Fifo,
            priority: 80,
            cpu: Some(2),
            lock_memory: true,
            fail_fast: false,
        }
    }
}

/// Scheduler policy for the measuring thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchedPolicy {
    /// SCHED_FIFO: First-in-first-out real-time.
    #[default]
    Fifo,
    /// SCHED_RR: Round-robin real-time.
    Rr,
    /// SCHED_OTHER: Normal time-sharing (non-RT).
    Other,
}

/// Report rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Number of equal-width histogram bins.
    pub histogram_bins: usize,

    /// Maximum histogram bar width in characters.
    pub max_bar_width: usize,

    /// Extra percentiles to include in the report (e.g. [99.0, 99.9]).
    /// Empty by default; min/max/mean/stddev are always reported.
    pub percentiles: Vec<f64>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            histogram_bins: 15,
            max_bar_width: 40,
            percentiles: vec![],
        }
    }
}

impl ProbeConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
