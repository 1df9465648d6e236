//! Configuration of a debugging session.

use crate::logging::LogLevel;
use serde::{Deserialize, Serialize};

/// Settings shared by every plugin of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct DebuggerConfig {
    /// Origin tag reported for every entry of `loadedSources`.
    pub origin: String,

    /// Name of the single thread reported by `threads`.
    pub thread_name: String,

    /// Verbosity requested by the host application.
    pub log_level: LogLevel,
}

impl Default for DebuggerConfig {
    fn default() -> Self {
        Self {
            origin: "dapbridge".to_string(),
            thread_name: "Main Thread".to_string(),
            log_level: LogLevel::default(),
        }
    }
}
