//! Log levels of the bridge.
//!
//! Logging goes through the [`log`] facade. Each component logs under its own
//! target (`dapbridge::hub`, `dapbridge::breakpoints`, ...) so a sink can
//! filter per component; the sink itself is installed by the host
//! application.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The verbosity of the bridge's logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every hook dispatch.
    Trace,
    /// State transitions.
    Debug,
    /// Command dispatch.
    #[default]
    Info,
    /// Rejected registrations and recoverable lookups.
    Warn,
    /// Faults only.
    Error,
}

impl LogLevel {
    /// All levels, from the most to the least verbose.
    pub const ALL: [Self; 5] = [
        Self::Trace,
        Self::Debug,
        Self::Info,
        Self::Warn,
        Self::Error,
    ];

    /// The name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// The matching filter of the [`log`] facade.
    pub const fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Trace => log::LevelFilter::Trace,
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warn => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid log level: {0}")]
pub struct ParseLogLevelError(String);

impl FromStr for LogLevel {
    type Err = ParseLogLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseLogLevelError(s.to_string()))
    }
}
