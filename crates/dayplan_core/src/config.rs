//! Runtime configuration for the scheduling core.
//!
//! # Responsibility
//! - Define serde-deserializable settings with sensible defaults.
//! - Reject settings that would make windows or log rotation meaningless.
//!
//! # Invariants
//! - `1 <= horizon_days <= MAX_HORIZON_DAYS`; the upcoming agenda always
//!   includes today and stays bounded.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_HORIZON_DAYS: u32 = 7;
/// Longest agenda window, one leap year.
pub const MAX_HORIZON_DAYS: u32 = 366;
pub const DEFAULT_MAX_LOG_FILE_BYTES: u64 = 10 * 1024 * 1024;
pub const DEFAULT_MAX_LOG_FILES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    ZeroHorizon,
    HorizonTooLong(u32),
    ZeroLogFileSize,
    ZeroLogFiles,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroHorizon => write!(f, "horizon_days must be at least 1"),
            Self::HorizonTooLong(days) => write!(
                f,
                "horizon_days must be at most {MAX_HORIZON_DAYS}, got {days}"
            ),
            Self::ZeroLogFileSize => write!(f, "max_file_bytes must be positive"),
            Self::ZeroLogFiles => write!(f, "max_files must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

/// Scheduling windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of days, starting today, shown in the upcoming agenda.
    /// Tasks committed beyond it count as backlog in active listings.
    pub horizon_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
        }
    }
}

impl SchedulerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_horizon(self.horizon_days)
    }
}

/// Checks an agenda window length against `1..=MAX_HORIZON_DAYS`.
pub fn check_horizon(horizon_days: u32) -> Result<(), ConfigError> {
    if horizon_days == 0 {
        return Err(ConfigError::ZeroHorizon);
    }
    if horizon_days > MAX_HORIZON_DAYS {
        return Err(ConfigError::HorizonTooLong(horizon_days));
    }
    Ok(())
}

/// File logging settings consumed by `logging::init_logging`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of trace|debug|info|warn|error.
    pub level: String,
    /// Absolute directory for rotated log files.
    pub log_dir: String,
    pub max_file_bytes: u64,
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: crate::logging::default_log_level().to_string(),
            log_dir: String::new(),
            max_file_bytes: DEFAULT_MAX_LOG_FILE_BYTES,
            max_files: DEFAULT_MAX_LOG_FILES,
        }
    }
}

impl LoggingConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_bytes == 0 {
            return Err(ConfigError::ZeroLogFileSize);
        }
        if self.max_files == 0 {
            return Err(ConfigError::ZeroLogFiles);
        }
        Ok(())
    }
}
