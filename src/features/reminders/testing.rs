//! Shared test doubles for the reminder subsystem: an in-memory settings
//! store, a recording trigger sink, recording output sinks, and a pinned
//! presence probe.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::dnd::PresenceProbe;
use super::entry::Settings;
use super::store::{SettingsStore, StoreError};
use crate::platform::{Notifier, Speaker, TriggerSink, TriggerSpec};

/// In-memory settings store. Saves drop the `dnd_defaulted` marker the
/// same way serialization does on the real wire.
pub(crate) struct MemStore {
    settings: Mutex<Settings>,
    save_count: AtomicUsize,
    fail_all_saves: AtomicBool,
}

impl MemStore {
    pub(crate) fn new(settings: Settings) -> Self {
        MemStore {
            settings: Mutex::new(settings),
            save_count: AtomicUsize::new(0),
            fail_all_saves: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_all_saves(&self) {
        self.fail_all_saves.store(true, Ordering::SeqCst);
    }

    pub(crate) fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsStore for MemStore {
    async fn load(&self) -> Settings {
        self.settings.lock().unwrap().clone()
    }

    async fn save(&self, settings: &Settings) -> Result<(), StoreError> {
        if self.fail_all_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("quota exceeded")));
        }
        self.save_count.fetch_add(1, Ordering::SeqCst);
        *self.settings.lock().unwrap() = Settings {
            dnd_defaulted: false,
            ..settings.clone()
        };
        Ok(())
    }
}

/// Trigger sink that records registrations instead of arming timers
pub(crate) struct RecordingTriggers {
    specs: Mutex<Vec<TriggerSpec>>,
    clear_count: AtomicUsize,
}

impl RecordingTriggers {
    pub(crate) fn new() -> Self {
        RecordingTriggers {
            specs: Mutex::new(Vec::new()),
            clear_count: AtomicUsize::new(0),
        }
    }

    /// Names of all registered triggers, sorted for stable comparison
    pub(crate) fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .specs
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TriggerSink for RecordingTriggers {
    async fn clear_all(&self) -> Result<()> {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        self.specs.lock().unwrap().clear();
        Ok(())
    }

    async fn create(&self, spec: TriggerSpec) -> Result<()> {
        self.specs.lock().unwrap().push(spec);
        Ok(())
    }
}

/// Notifier that records shown notifications and clear attempts
pub(crate) struct RecordingNotifier {
    shown: Mutex<Vec<(String, String)>>,
    cleared: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub(crate) fn new() -> Self {
        RecordingNotifier {
            shown: Mutex::new(Vec::new()),
            cleared: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub(crate) fn fail_all(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn shown(&self) -> Vec<(String, String)> {
        self.shown.lock().unwrap().clone()
    }

    pub(crate) fn cleared(&self) -> Vec<String> {
        self.cleared.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("notification service unavailable"));
        }
        let mut shown = self.shown.lock().unwrap();
        shown.push((title.to_string(), body.to_string()));
        Ok(format!("n{}", shown.len()))
    }

    async fn clear(&self, id: &str) -> Result<bool> {
        self.cleared.lock().unwrap().push(id.to_string());
        Ok(true)
    }
}

/// Speaker that records spoken lines
pub(crate) struct RecordingSpeaker {
    lines: Mutex<Vec<String>>,
}

impl RecordingSpeaker {
    pub(crate) fn new() -> Self {
        RecordingSpeaker {
            lines: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for RecordingSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        self.lines.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// Presence probe with pinned signal values
pub(crate) struct PinnedProbe {
    pub(crate) locked: bool,
    pub(crate) audible: bool,
    pub(crate) fullscreen: bool,
}

impl PinnedProbe {
    pub(crate) fn quiet() -> Self {
        PinnedProbe {
            locked: false,
            audible: false,
            fullscreen: false,
        }
    }

    pub(crate) fn locked() -> Self {
        PinnedProbe {
            locked: true,
            audible: false,
            fullscreen: false,
        }
    }
}

#[async_trait]
impl PresenceProbe for PinnedProbe {
    async fn is_locked(&self) -> bool {
        self.locked
    }
    async fn has_audible_playback(&self) -> bool {
        self.audible
    }
    async fn has_fullscreen_window(&self) -> bool {
        self.fullscreen
    }
}
