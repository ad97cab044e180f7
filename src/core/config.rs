//! # Configuration
//!
//! Environment-based configuration for the deskbell worker.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Added SPEECH_COMMAND for the external synthesizer
//! - 1.1.0: Added HEARTBEAT_SECS for IPC keep-alive tuning
//! - 1.0.0: Initial creation with settings path and log level

use anyhow::Result;

/// Default location of the durable settings record
pub const DEFAULT_SETTINGS_PATH: &str = "deskbell-settings.json";

/// Default interval between IPC heartbeats, in seconds
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Runtime configuration for the worker
#[derive(Debug, Clone)]
pub struct Config {
    /// Path of the JSON settings record (reminders, DND, announcements)
    pub settings_path: String,
    /// External speech synthesizer command, e.g. `espeak-ng -v en`.
    /// Speech output is disabled when unset.
    pub speech_command: Option<String>,
    /// Default log filter when RUST_LOG is not set
    pub log_level: String,
    /// Seconds between heartbeat events to connected pages
    pub heartbeat_secs: u64,
}

impl Config {
    /// Build a Config from environment variables, applying defaults for
    /// everything that is not set. Never fails on missing variables; a
    /// malformed HEARTBEAT_SECS falls back to the default.
    pub fn from_env() -> Result<Self> {
        let settings_path = std::env::var("DESKBELL_SETTINGS_PATH")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string());

        let speech_command = std::env::var("DESKBELL_SPEECH_COMMAND")
            .ok()
            .filter(|cmd| !cmd.trim().is_empty());

        let log_level = std::env::var("DESKBELL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let heartbeat_secs = std::env::var("DESKBELL_HEARTBEAT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_HEARTBEAT_SECS);

        Ok(Config {
            settings_path,
            speech_command,
            log_level,
            heartbeat_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        // Only assert on fields no test environment is expected to set
        let config = Config::from_env().unwrap();
        assert!(!config.settings_path.is_empty());
        assert!(config.heartbeat_secs > 0);
    }
}
