//! # Trigger Computation
//!
//! Pure scheduling arithmetic: which triggers should exist for a given
//! settings record at a given instant. The scheduler feeds the result to
//! the trigger sink; keeping this free of I/O lets every boundary case
//! run against a fixed clock.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.4.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Clock-aligned announcement boundaries
//! - 1.0.0: Initial next-fire and expiry rules

use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDate, TimeZone, Timelike};
use std::time::Duration;

use super::entry::{ReminderEntry, ReminderKind, Settings};
use crate::platform::TriggerSpec;

/// Trigger name prefix for reminder entries; the suffix is the entry id
pub const REMINDER_TRIGGER_PREFIX: &str = "reminder_";

/// Name of the single recurring time-announcement trigger
pub const ANNOUNCE_TRIGGER: &str = "time_announce";

/// One-shot entries older than this are dropped at resync. The window
/// absorbs clock skew and timezone ambiguity; tightening it risks
/// deleting reminders that are about to fire.
pub const EXPIRY_GRACE_MINUTES: i64 = 10;

/// An announcement boundary closer than this gets pushed out one full
/// period so the trigger does not double-fire immediately.
const MIN_BOUNDARY_LEAD_SECS: i64 = 60;

/// Everything one resync pass needs: the triggers to register, the
/// entries that stay in the record, and the expired ones to drop.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerPlan {
    pub triggers: Vec<TriggerSpec>,
    pub valid: Vec<ReminderEntry>,
    pub expired: Vec<ReminderEntry>,
}

/// Trigger name for a reminder entry
pub fn reminder_trigger_name(id: &str) -> String {
    format!("{REMINDER_TRIGGER_PREFIX}{id}")
}

/// Reverse-map a trigger name back to the entry id it was created for
pub fn reminder_id_from_trigger(name: &str) -> Option<&str> {
    name.strip_prefix(REMINDER_TRIGGER_PREFIX)
}

/// Split entries into those to keep and those that expired. Only `Once`
/// entries with a parseable time can expire; everything else is kept —
/// a parse error must never silently drop data.
pub fn partition_expired(
    reminders: &[ReminderEntry],
    now: DateTime<Local>,
) -> (Vec<ReminderEntry>, Vec<ReminderEntry>) {
    let threshold = now - ChronoDuration::minutes(EXPIRY_GRACE_MINUTES);
    let mut valid = Vec::new();
    let mut expired = Vec::new();

    for entry in reminders {
        let is_expired = entry.kind == ReminderKind::Once
            && matches!(entry.fire_time(), Some(t) if t <= threshold);
        if is_expired {
            expired.push(entry.clone());
        } else {
            valid.push(entry.clone());
        }
    }
    (valid, expired)
}

fn at_time_of_day(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Local>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    Local.from_local_datetime(&naive).earliest()
}

/// Next fire instant for an entry: today at the entry's time-of-day, or
/// tomorrow if that has already passed. The date component of the stored
/// time is deliberately ignored — a one-shot authored yesterday that
/// never fired still goes off at its time-of-day.
pub fn next_fire(fire_time: DateTime<Local>, now: DateTime<Local>) -> DateTime<Local> {
    let (hour, minute) = (fire_time.hour(), fire_time.minute());
    match at_time_of_day(now.date_naive(), hour, minute) {
        Some(today) if today > now => today,
        _ => now
            .date_naive()
            .succ_opt()
            .and_then(|tomorrow| at_time_of_day(tomorrow, hour, minute))
            .unwrap_or_else(|| now + ChronoDuration::days(1)),
    }
}

/// Next clock-aligned announcement boundary. Sub-hour intervals align to
/// minute multiples within the hour, hour-level intervals to hour
/// multiples within the day; an already-aligned instant advances one
/// full period, as does a boundary under a minute away.
pub fn next_aligned_boundary(now: DateTime<Local>, interval_minutes: u32) -> DateTime<Local> {
    let interval = interval_minutes.max(1);

    let next_minute_of_day = if interval < 60 {
        let minute = now.minute();
        let next = if minute % interval == 0 {
            minute + interval
        } else {
            (minute / interval + 1) * interval
        };
        now.hour() * 60 + next
    } else {
        let hours_interval = interval / 60;
        let hour = now.hour();
        let next = if hour % hours_interval == 0 {
            hour + hours_interval
        } else {
            (hour / hours_interval + 1) * hours_interval
        };
        next * 60
    };

    let midnight = at_time_of_day(now.date_naive(), 0, 0);
    let mut boundary = match midnight {
        Some(base) => base + ChronoDuration::minutes(i64::from(next_minute_of_day)),
        None => now + ChronoDuration::minutes(i64::from(interval)),
    };

    if boundary.signed_duration_since(now) < ChronoDuration::seconds(MIN_BOUNDARY_LEAD_SECS) {
        boundary = boundary + ChronoDuration::minutes(i64::from(interval));
    }
    boundary
}

/// Compute the complete trigger set for a settings record. Deterministic
/// for a given (settings, now) pair, which is what makes resync
/// idempotent. Entries whose time cannot be parsed stay in the record
/// but get no trigger.
pub fn compute_trigger_set(settings: &Settings, now: DateTime<Local>) -> TriggerPlan {
    let (valid, expired) = partition_expired(&settings.reminders, now);

    let mut triggers = Vec::new();
    for entry in &valid {
        let Some(fire_time) = entry.fire_time() else {
            continue;
        };
        let repeat = match entry.kind {
            ReminderKind::Once => None,
            ReminderKind::Daily => Some(Duration::from_secs(24 * 60 * 60)),
        };
        triggers.push(TriggerSpec {
            name: reminder_trigger_name(&entry.id),
            fire_at: next_fire(fire_time, now),
            repeat,
        });
    }

    let announce = &settings.announce;
    if announce.enabled && (announce.voice || announce.system_notify) {
        triggers.push(TriggerSpec {
            name: ANNOUNCE_TRIGGER.to_string(),
            fire_at: next_aligned_boundary(now, announce.interval_minutes),
            repeat: Some(Duration::from_secs(u64::from(announce.interval_minutes.max(1)) * 60)),
        });
    }

    TriggerPlan {
        triggers,
        valid,
        expired,
    }
}
