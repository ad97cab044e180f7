//! # Do-Not-Disturb Evaluation
//!
//! Decides whether a fired trigger may produce output. Three presence
//! signals are probed concurrently and all three are awaited before the
//! combined decision — a slow probe must not let output slip through.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false

use async_trait::async_trait;

use super::entry::DndPreferences;

/// Source of the three presence signals. The worker aggregates reports
/// from connected UI pages; tests pin the values directly.
#[async_trait]
pub trait PresenceProbe: Send + Sync {
    /// Screen locked or session idle past the lock threshold
    async fn is_locked(&self) -> bool;
    /// Any page playing audible, unmuted content
    async fn has_audible_playback(&self) -> bool;
    /// Any window in fullscreen state
    async fn has_fullscreen_window(&self) -> bool;
}

/// Snapshot of the probed signals, kept for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DndStatus {
    pub locked: bool,
    pub audible: bool,
    pub fullscreen: bool,
}

/// Probe all three signals concurrently and combine with the user's
/// preferences. Join semantics: the decision waits for every probe.
pub async fn should_suppress(
    prefs: &DndPreferences,
    probe: &dyn PresenceProbe,
) -> (bool, DndStatus) {
    let (locked, audible, fullscreen) = tokio::join!(
        probe.is_locked(),
        probe.has_audible_playback(),
        probe.has_fullscreen_window(),
    );

    let status = DndStatus {
        locked,
        audible,
        fullscreen,
    };
    let suppress = (prefs.when_locked && locked)
        || (prefs.when_audible && audible)
        || (prefs.when_fullscreen && fullscreen);
    (suppress, status)
}
