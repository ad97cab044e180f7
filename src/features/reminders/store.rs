//! # Settings Store
//!
//! Load/save access to the durable settings record. Loads never fail:
//! a missing or corrupt file yields per-field defaults, because losing a
//! front desk's reminder list over a parse error is worse than any stale
//! trigger. Saves can fail and get bounded retry where it matters.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: save_with_retry for the one-shot deletion write
//! - 1.1.0: Store trait extracted so handlers can be tested against fakes
//! - 1.0.0: Initial JSON file store

use async_trait::async_trait;
use log::{error, info, warn};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use super::entry::Settings;

/// Retries after a failed save, on top of the initial attempt
pub const SAVE_RETRY_LIMIT: u32 = 3;

/// First backoff delay; doubles on each further retry (500, 1000, 2000ms)
pub const SAVE_RETRY_BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to write settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode settings: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Whole-record access to the settings store. All writers replace the
/// record as a unit; there is no field-level patching, which bounds a
/// lost update to "the record as of the losing writer's read".
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Load the persisted record, or a default one if none exists.
    /// Absent or corrupt fields are defaulted individually.
    async fn load(&self) -> Settings;

    /// Persist the whole record
    async fn save(&self, settings: &Settings) -> Result<(), StoreError>;
}

/// JSON-file-backed settings store
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> Settings {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No settings record at {:?}, starting empty", self.path);
                return Settings {
                    dnd_defaulted: true,
                    ..Settings::default()
                };
            }
            Err(e) => {
                warn!("Failed to read settings from {:?}: {e}", self.path);
                return Settings {
                    dnd_defaulted: true,
                    ..Settings::default()
                };
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(value) => Settings::from_value(value),
            Err(e) => {
                warn!("Settings record at {:?} is not valid JSON: {e}", self.path);
                Settings {
                    dnd_defaulted: true,
                    ..Settings::default()
                }
            }
        }
    }

    async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        let encoded = serde_json::to_vec_pretty(settings)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, encoded).await?;
        Ok(())
    }
}

/// Persist with bounded retry and exponential backoff. Used for the
/// highest-cost-of-loss write, removing a fired one-shot reminder.
/// Returns true on success; permanent failure is logged and left to the
/// caller's safety-net resync.
pub async fn save_with_retry(store: &dyn SettingsStore, settings: &Settings) -> bool {
    let mut delay = SAVE_RETRY_BASE;
    for attempt in 0..=SAVE_RETRY_LIMIT {
        match store.save(settings).await {
            Ok(()) => {
                if attempt > 0 {
                    info!("Settings save succeeded after {attempt} retries");
                }
                return true;
            }
            Err(e) if attempt < SAVE_RETRY_LIMIT => {
                warn!(
                    "Settings save failed (attempt {}/{}): {e}. Retrying in {:?}...",
                    attempt + 1,
                    SAVE_RETRY_LIMIT + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                error!(
                    "Settings save permanently failed after {} attempts: {e}",
                    SAVE_RETRY_LIMIT + 1
                );
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::entry::{ReminderEntry, ReminderKind};

    #[tokio::test]
    async fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));

        let settings = store.load().await;
        assert!(settings.reminders.is_empty());
        assert!(settings.dnd.when_locked);
        assert!(settings.dnd_defaulted);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("settings.json"));

        let mut settings = Settings::default();
        settings.reminders.push(ReminderEntry {
            id: "r1".to_string(),
            time: "2026-03-01T09:00:00".to_string(),
            text: "prepare checkout slips".to_string(),
            kind: ReminderKind::Daily,
        });
        settings.hour12 = true;
        store.save(&settings).await.unwrap();

        let loaded = store.load().await;
        assert_eq!(loaded.reminders, settings.reminders);
        assert!(loaded.hour12);
        // a record we wrote always carries the full DND block
        assert!(!loaded.dnd_defaulted);
    }

    #[tokio::test]
    async fn test_load_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        tokio::fs::write(&path, b"{{{ not json").await.unwrap();

        let settings = JsonFileStore::new(path).load().await;
        assert!(settings.reminders.is_empty());
        assert!(settings.dnd_defaulted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_with_retry_gives_up_after_limit() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct FailingStore {
            attempts: AtomicU32,
        }

        #[async_trait]
        impl SettingsStore for FailingStore {
            async fn load(&self) -> Settings {
                Settings::default()
            }
            async fn save(&self, _settings: &Settings) -> Result<(), StoreError> {
                self.attempts.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Io(std::io::Error::other("disk full")))
            }
        }

        let store = FailingStore {
            attempts: AtomicU32::new(0),
        };
        let ok = save_with_retry(&store, &Settings::default()).await;
        assert!(!ok);
        assert_eq!(store.attempts.load(Ordering::SeqCst), SAVE_RETRY_LIMIT + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_with_retry_recovers_after_transient_failure() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct FlakyStore {
            attempts: AtomicU32,
        }

        #[async_trait]
        impl SettingsStore for FlakyStore {
            async fn load(&self) -> Settings {
                Settings::default()
            }
            async fn save(&self, _settings: &Settings) -> Result<(), StoreError> {
                // first two writes fail, third lands
                if self.attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Io(std::io::Error::other("transient")))
                } else {
                    Ok(())
                }
            }
        }

        let store = FlakyStore {
            attempts: AtomicU32::new(0),
        };
        assert!(save_with_retry(&store, &Settings::default()).await);
        assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
    }
}
