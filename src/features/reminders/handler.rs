//! # Trigger Handler
//!
//! Reacts to fired triggers: evaluates do-not-disturb, emits the
//! notification and speech output, and removes fired one-shot reminders.
//! All output goes through the injected sink traits, so the announcement
//! and reminder paths share one suppression/output implementation.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.5.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Auto-clear re-checks one-shot deletion defensively
//! - 1.2.0: Retry with backoff on the one-shot deletion write
//! - 1.1.0: Time announcements routed through the same DND check
//! - 1.0.0: Initial fire handling

use chrono::{DateTime, Local, Timelike};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

use super::dnd::{should_suppress, PresenceProbe};
use super::entry::ReminderKind;
use super::schedule::{reminder_id_from_trigger, ANNOUNCE_TRIGGER};
use super::scheduler::Scheduler;
use super::store::{save_with_retry, SettingsStore};
use crate::ipc::WorkerEvent;
use crate::platform::{Notifier, Speaker};

/// Sticky notifications are cleared after this long if still present
pub const NOTIFICATION_AUTO_CLEAR: Duration = Duration::from_secs(5 * 60);

/// Gap between the two spoken repetitions of a reminder
const SPEAK_REPEAT_GAP: Duration = Duration::from_secs(3);

/// Format the current time for notifications and speech
pub fn format_time_message(now: DateTime<Local>, hour12: bool) -> String {
    if hour12 {
        let (is_pm, hour) = now.hour12();
        let period = if is_pm { "PM" } else { "AM" };
        format!("It is {}:{:02} {}", hour, now.minute(), period)
    } else {
        format!("It is {}:{:02}", now.hour(), now.minute())
    }
}

pub struct TriggerHandler {
    store: Arc<dyn SettingsStore>,
    scheduler: Arc<Scheduler>,
    notifier: Arc<dyn Notifier>,
    speaker: Arc<dyn Speaker>,
    probe: Arc<dyn PresenceProbe>,
    events: broadcast::Sender<WorkerEvent>,
}

impl TriggerHandler {
    pub fn new(
        store: Arc<dyn SettingsStore>,
        scheduler: Arc<Scheduler>,
        notifier: Arc<dyn Notifier>,
        speaker: Arc<dyn Speaker>,
        probe: Arc<dyn PresenceProbe>,
        events: broadcast::Sender<WorkerEvent>,
    ) -> Self {
        TriggerHandler {
            store,
            scheduler,
            notifier,
            speaker,
            probe,
            events,
        }
    }

    /// Dispatch a fired trigger by name
    pub async fn on_trigger(&self, name: &str) {
        debug!("Trigger fired: {name}");
        if name == ANNOUNCE_TRIGGER {
            self.on_announce().await;
        } else if let Some(id) = reminder_id_from_trigger(name) {
            self.on_reminder(id).await;
        } else {
            warn!("Fired trigger {name} matches no known namespace");
        }
    }

    async fn on_announce(&self) {
        let settings = self.store.load().await;
        let announce = settings.announce;
        // settings may have changed after the trigger was armed
        if !announce.enabled || !(announce.voice || announce.system_notify) {
            debug!("Announcement trigger fired while disabled, ignoring");
            return;
        }

        let (suppress, status) = should_suppress(&settings.dnd, &*self.probe).await;
        if suppress {
            info!("Do-not-disturb active ({status:?}), skipping time announcement");
            return;
        }

        let now = Local::now();
        let text = format_time_message(now, settings.hour12);

        if announce.system_notify {
            if let Err(e) = self.notifier.notify("Time check", &text).await {
                warn!("Failed to show announcement notification: {e}");
            }
        }
        if announce.voice {
            if let Err(e) = self.speaker.speak(&text).await {
                warn!("Announcement speech failed: {e}");
            }
        }

        let _ = self.events.send(WorkerEvent::TimeAnnounced { time: now });
    }

    async fn on_reminder(&self, id: &str) {
        let settings = self.store.load().await;
        let Some(entry) = settings.reminders.iter().find(|r| r.id == id).cloned() else {
            info!("Trigger fired for reminder {id} no longer in the record, ignoring");
            return;
        };

        let (suppress, status) = should_suppress(&settings.dnd, &*self.probe).await;
        if suppress {
            // A suppressed one-shot is neither deleted nor rescheduled; it
            // stays in the record until a later resync or expiry cleanup.
            info!(
                "Do-not-disturb active ({status:?}), skipping reminder {id} ({})",
                entry.text
            );
            return;
        }

        match self.notifier.notify("Reminder", &entry.text).await {
            Ok(notification_id) => self.spawn_auto_clear(notification_id, entry.clone()),
            Err(e) => warn!("Failed to show reminder notification: {e}"),
        }

        let line = format!("Reminder: {}", entry.text);
        for repetition in 0..2 {
            if repetition > 0 {
                tokio::time::sleep(SPEAK_REPEAT_GAP).await;
            }
            if let Err(e) = self.speaker.speak(&line).await {
                warn!("Reminder speech failed: {e}");
            }
        }

        let _ = self.events.send(WorkerEvent::ReminderFired {
            reminder: entry.clone(),
        });

        if entry.kind == ReminderKind::Once {
            self.remove_fired_one_shot(&entry.id).await;
        }
    }

    /// Remove a fired one-shot from the record. The resync at the end runs
    /// unconditionally: even after a permanent save failure the trigger
    /// table must track whatever the record still says.
    async fn remove_fired_one_shot(&self, id: &str) {
        let mut settings = self.store.load().await;
        let before = settings.reminders.len();
        settings.reminders.retain(|r| r.id != id);

        if settings.reminders.len() < before {
            if save_with_retry(&*self.store, &settings).await {
                info!("Removed fired one-shot reminder {id}");
                let _ = self.events.send(WorkerEvent::RemindersChanged {
                    reminders: settings.reminders.clone(),
                });
            }
        }

        self.scheduler.resync().await;
    }

    /// Clear the notification after five minutes if the user has not
    /// dismissed it, and re-run the one-shot deletion in case the write
    /// after the fire was lost.
    fn spawn_auto_clear(&self, notification_id: String, entry: super::entry::ReminderEntry) {
        let notifier = self.notifier.clone();
        let store = self.store.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            tokio::time::sleep(NOTIFICATION_AUTO_CLEAR).await;
            match notifier.clear(&notification_id).await {
                Ok(true) => {
                    debug!("Auto-cleared notification {notification_id}");
                    if entry.kind == ReminderKind::Once {
                        let mut settings = store.load().await;
                        let before = settings.reminders.len();
                        settings.reminders.retain(|r| r.id != entry.id);
                        if settings.reminders.len() < before
                            && save_with_retry(&*store, &settings).await
                        {
                            let _ = events.send(WorkerEvent::RemindersChanged {
                                reminders: settings.reminders.clone(),
                            });
                        }
                    }
                }
                Ok(false) => debug!("Notification {notification_id} already dismissed"),
                Err(e) => warn!("Failed to auto-clear notification {notification_id}: {e}"),
            }
        });
    }
}
