//! # Reminders Feature
//!
//! Scheduled reminders and periodic time announcements with
//! do-not-disturb suppression.
//!
//! Three pieces: the settings store (durable record), the scheduler
//! (clear-and-rebuild trigger registration), and the trigger handler
//! (firing, suppression, one-shot removal).
//!
//! - **Version**: 1.6.0
//! - **Since**: 0.3.0
//! - **Toggleable**: true

pub mod dnd;
pub mod entry;
pub mod handler;
pub mod schedule;
pub mod scheduler;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use dnd::{should_suppress, DndStatus, PresenceProbe};
pub use entry::{AnnounceSettings, DndPreferences, ReminderEntry, ReminderKind, Settings};
pub use handler::TriggerHandler;
pub use schedule::{
    compute_trigger_set, next_aligned_boundary, next_fire, partition_expired,
    reminder_id_from_trigger, reminder_trigger_name, TriggerPlan, ANNOUNCE_TRIGGER,
    EXPIRY_GRACE_MINUTES, REMINDER_TRIGGER_PREFIX,
};
pub use scheduler::Scheduler;
pub use store::{save_with_retry, JsonFileStore, SettingsStore, StoreError};
