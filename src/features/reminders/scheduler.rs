//! # Reminder Scheduler
//!
//! Keeps the trigger runtime in sync with the settings record. There is
//! no diffing: every resync wipes the trigger table and rebuilds it from
//! the record, so two racing resyncs converge on whichever ran last.
//!
//! - **Version**: 1.2.0
//! - **Since**: 0.4.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Broadcast RemindersChanged after expiry cleanup
//! - 1.1.0: DND defaults merged into pre-upgrade records
//! - 1.0.0: Initial clear-and-rebuild pass

use chrono::Local;
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::broadcast;

use super::schedule::compute_trigger_set;
use super::store::SettingsStore;
use crate::ipc::WorkerEvent;
use crate::platform::TriggerSink;

pub struct Scheduler {
    store: Arc<dyn SettingsStore>,
    triggers: Arc<dyn TriggerSink>,
    events: broadcast::Sender<WorkerEvent>,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        triggers: Arc<dyn TriggerSink>,
        events: broadcast::Sender<WorkerEvent>,
    ) -> Self {
        Scheduler {
            store,
            triggers,
            events,
        }
    }

    /// One full clear-and-rebuild pass. Never fails: storage problems
    /// leave the record possibly stale, trigger-sink problems are logged
    /// and skipped — a missed registration heals on the next resync.
    pub async fn resync(&self) {
        let mut settings = self.store.load().await;

        // Records written before the DND block existed get the merged
        // shape persisted so the UI sees the full record
        if settings.dnd_defaulted {
            match self.store.save(&settings).await {
                Ok(()) => {
                    info!("Merged default do-not-disturb preferences into settings record");
                    settings.dnd_defaulted = false;
                }
                Err(e) => warn!("Failed to persist merged DND defaults: {e}"),
            }
        }

        if let Err(e) = self.triggers.clear_all().await {
            error!("Failed to clear triggers: {e}");
        }

        let plan = compute_trigger_set(&settings, Local::now());

        if !plan.expired.is_empty() {
            for entry in &plan.expired {
                info!(
                    "Dropping expired one-shot reminder {} ({})",
                    entry.id, entry.text
                );
            }
            settings.reminders = plan.valid.clone();
            match self.store.save(&settings).await {
                Ok(()) => {
                    let _ = self.events.send(WorkerEvent::RemindersChanged {
                        reminders: settings.reminders.clone(),
                    });
                }
                Err(e) => warn!("Failed to persist expiry cleanup: {e}"),
            }
        }

        let mut registered = 0usize;
        for spec in plan.triggers {
            let name = spec.name.clone();
            match self.triggers.create(spec).await {
                Ok(()) => registered += 1,
                Err(e) => error!("Failed to register trigger {name}: {e}"),
            }
        }
        debug!(
            "Resync complete: {registered} trigger(s) registered, {} entries kept",
            settings.reminders.len()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reminders::entry::{ReminderEntry, ReminderKind, Settings};
    use crate::features::reminders::schedule::{reminder_trigger_name, ANNOUNCE_TRIGGER};
    use crate::features::reminders::testing::{MemStore, RecordingTriggers};
    use chrono::Duration as ChronoDuration;

    fn scheduler_with(
        settings: Settings,
    ) -> (Scheduler, Arc<MemStore>, Arc<RecordingTriggers>, broadcast::Receiver<WorkerEvent>) {
        let store = Arc::new(MemStore::new(settings));
        let triggers = Arc::new(RecordingTriggers::new());
        let (events, events_rx) = broadcast::channel(16);
        let scheduler = Scheduler::new(store.clone(), triggers.clone(), events);
        (scheduler, store, triggers, events_rx)
    }

    fn upcoming_entry(id: &str, kind: ReminderKind, offset: ChronoDuration) -> ReminderEntry {
        let time = (Local::now() + offset).format("%Y-%m-%dT%H:%M:%S").to_string();
        ReminderEntry {
            id: id.to_string(),
            time,
            text: format!("task {id}"),
            kind,
        }
    }

    #[tokio::test]
    async fn test_resync_is_idempotent() {
        let mut settings = Settings::default();
        settings.reminders = vec![
            upcoming_entry("a", ReminderKind::Once, ChronoDuration::hours(1)),
            upcoming_entry("b", ReminderKind::Daily, ChronoDuration::hours(2)),
        ];
        let (scheduler, _, triggers, _rx) = scheduler_with(settings);

        scheduler.resync().await;
        let first = triggers.names();

        scheduler.resync().await;
        let second = triggers.names();

        assert_eq!(first, second);
        assert!(first.contains(&reminder_trigger_name("a")));
        assert!(first.contains(&reminder_trigger_name("b")));
        assert!(first.contains(&ANNOUNCE_TRIGGER.to_string()));
    }

    #[tokio::test]
    async fn test_resync_drops_expired_and_broadcasts() {
        let mut settings = Settings::default();
        settings.announce.enabled = false;
        settings.reminders = vec![
            upcoming_entry("old", ReminderKind::Once, -ChronoDuration::minutes(30)),
            upcoming_entry("new", ReminderKind::Once, ChronoDuration::minutes(30)),
        ];
        let (scheduler, store, triggers, mut events_rx) = scheduler_with(settings);

        scheduler.resync().await;

        let remaining = store.load().await.reminders;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "new");

        assert_eq!(triggers.names(), vec![reminder_trigger_name("new")]);

        match events_rx.try_recv().unwrap() {
            WorkerEvent::RemindersChanged { reminders } => {
                assert_eq!(reminders.len(), 1);
                assert_eq!(reminders[0].id, "new");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_resync_persists_merged_dnd_defaults() {
        let mut settings = Settings::default();
        settings.dnd_defaulted = true;
        let (scheduler, store, _, _rx) = scheduler_with(settings);

        scheduler.resync().await;

        assert_eq!(store.save_count(), 1);
        assert!(!store.load().await.dnd_defaulted);
    }

    #[tokio::test]
    async fn test_resync_without_changes_does_not_save() {
        let mut settings = Settings::default();
        settings.reminders = vec![upcoming_entry(
            "keep",
            ReminderKind::Daily,
            ChronoDuration::hours(1),
        )];
        let (scheduler, store, _, _rx) = scheduler_with(settings);

        scheduler.resync().await;
        assert_eq!(store.save_count(), 0);
    }
}
