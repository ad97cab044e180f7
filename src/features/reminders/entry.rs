//! # Reminder Data Model
//!
//! The durable settings record shared by the worker and the UI pages:
//! reminder entries, do-not-disturb preferences, and the periodic
//! time-announcement block.
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Per-field defaulting via Settings::from_value
//! - 1.2.0: Added hour12 clock-format flag
//! - 1.1.0: Added announcement block
//! - 1.0.0: Initial reminder and DND types

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How often a reminder fires
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    /// Fires at most once, then is removed from the record
    #[default]
    Once,
    /// Fires every day at the same time-of-day, persists indefinitely
    Daily,
}

/// A single scheduled reminder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderEntry {
    /// Opaque unique identifier, immutable after creation
    pub id: String,
    /// Fire time as written by the UI (RFC 3339 or `YYYY-MM-DDTHH:MM:SS`).
    /// Kept verbatim so an unparseable value survives load/save round-trips
    /// instead of taking the whole record down with it.
    pub time: String,
    /// User-supplied message, non-empty
    pub text: String,
    #[serde(default)]
    pub kind: ReminderKind,
}

impl ReminderEntry {
    /// Parse the stored fire time. Returns None when the value is
    /// malformed; callers treat such entries as valid-but-unschedulable.
    pub fn fire_time(&self) -> Option<DateTime<Local>> {
        parse_entry_time(&self.time)
    }
}

/// Parse a UI-written timestamp in the formats the pages produce
fn parse_entry_time(raw: &str) -> Option<DateTime<Local>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local));
    }
    // Pages running without timezone info write a bare local datetime
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Local.from_local_datetime(&naive).earliest();
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Local.from_local_datetime(&naive).earliest();
    }
    None
}

/// Do-not-disturb preferences. All conditions default to on so a fresh
/// install never interrupts a guest-facing screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DndPreferences {
    #[serde(default = "default_true")]
    pub when_locked: bool,
    #[serde(default = "default_true")]
    pub when_audible: bool,
    #[serde(default = "default_true")]
    pub when_fullscreen: bool,
}

impl Default for DndPreferences {
    fn default() -> Self {
        DndPreferences {
            when_locked: true,
            when_audible: true,
            when_fullscreen: true,
        }
    }
}

/// Periodic time-announcement settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnounceSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval between announcements; boundaries are aligned to the wall
    /// clock (every N minutes past the hour, or every N/60 hours)
    #[serde(default = "default_interval")]
    pub interval_minutes: u32,
    /// Speak the time through the speech sink
    #[serde(default = "default_true")]
    pub voice: bool,
    /// Show a desktop notification with the time
    #[serde(default = "default_true")]
    pub system_notify: bool,
}

impl Default for AnnounceSettings {
    fn default() -> Self {
        AnnounceSettings {
            enabled: true,
            interval_minutes: 60,
            voice: true,
            system_notify: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_interval() -> u32 {
    60
}

/// The whole durable settings record. Always loaded and replaced as a
/// unit; no component patches individual fields in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub reminders: Vec<ReminderEntry>,
    #[serde(default)]
    pub dnd: DndPreferences,
    #[serde(default)]
    pub announce: AnnounceSettings,
    /// 12-hour clock format for spoken and displayed times
    #[serde(default)]
    pub hour12: bool,
    /// True when the persisted record predates the DND block; the next
    /// resync writes the merged shape back so later readers see it.
    #[serde(skip)]
    pub dnd_defaulted: bool,
}

impl Settings {
    /// Build a Settings record from raw JSON, defaulting absent or corrupt
    /// fields one at a time rather than rejecting the whole record. Also
    /// reports whether the DND block had to be filled in, so the caller
    /// can persist the upgraded shape.
    pub fn from_value(value: Value) -> Settings {
        let obj = match value {
            Value::Object(map) => map,
            _ => {
                return Settings {
                    dnd_defaulted: true,
                    ..Settings::default()
                }
            }
        };

        let reminders = obj
            .get("reminders")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|v| serde_json::from_value::<ReminderEntry>(v.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let dnd_present = obj
            .get("dnd")
            .map(|d| {
                ["when_locked", "when_audible", "when_fullscreen"]
                    .iter()
                    .all(|key| d.get(key).map(Value::is_boolean).unwrap_or(false))
            })
            .unwrap_or(false);

        let dnd = obj
            .get("dnd")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let announce = obj
            .get("announce")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        let hour12 = obj
            .get("hour12")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        Settings {
            reminders,
            dnd,
            announce,
            hour12,
            dnd_defaulted: !dnd_present,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_kind_wire_format() {
        let entry = ReminderEntry {
            id: "a1".to_string(),
            time: "2026-03-01T09:00:00".to_string(),
            text: "wake-up call room 412".to_string(),
            kind: ReminderKind::Daily,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"daily\""));

        let back: ReminderEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, ReminderKind::Daily);
    }

    #[test]
    fn test_kind_defaults_to_once() {
        let entry: ReminderEntry = serde_json::from_str(
            r#"{"id":"x","time":"2026-03-01T09:00:00","text":"check POS drawer"}"#,
        )
        .unwrap();
        assert_eq!(entry.kind, ReminderKind::Once);
    }

    #[test]
    fn test_fire_time_parses_common_formats() {
        let mut entry = ReminderEntry {
            id: "t".to_string(),
            time: "2026-03-01T09:30:00".to_string(),
            text: "shift handover".to_string(),
            kind: ReminderKind::Once,
        };
        let parsed = entry.fire_time().unwrap();
        assert_eq!((parsed.hour(), parsed.minute()), (9, 30));

        entry.time = "2026-03-01 09:30:00".to_string();
        assert!(entry.fire_time().is_some());

        entry.time = "not a timestamp".to_string();
        assert!(entry.fire_time().is_none());
    }

    #[test]
    fn test_from_value_defaults_missing_fields_individually() {
        let raw = serde_json::json!({
            "reminders": [
                {"id": "ok", "time": "2026-03-01T09:00:00", "text": "fold towels"},
                "not an object",
            ],
            "announce": {"interval_minutes": 30},
        });

        let settings = Settings::from_value(raw);
        assert_eq!(settings.reminders.len(), 1);
        assert_eq!(settings.reminders[0].id, "ok");
        assert_eq!(settings.announce.interval_minutes, 30);
        // absent announce fields default individually
        assert!(settings.announce.enabled);
        // the DND block was absent entirely
        assert!(settings.dnd_defaulted);
        assert!(settings.dnd.when_locked);
        assert!(settings.dnd.when_audible);
        assert!(settings.dnd.when_fullscreen);
    }

    #[test]
    fn test_from_value_complete_record_is_not_flagged() {
        let raw = serde_json::json!({
            "reminders": [],
            "dnd": {"when_locked": false, "when_audible": true, "when_fullscreen": true},
            "announce": {"enabled": false, "interval_minutes": 15, "voice": false, "system_notify": true},
            "hour12": true,
        });

        let settings = Settings::from_value(raw);
        assert!(!settings.dnd_defaulted);
        assert!(!settings.dnd.when_locked);
        assert!(!settings.announce.enabled);
        assert!(settings.hour12);
    }

    #[test]
    fn test_from_value_non_object_falls_back_to_defaults() {
        let settings = Settings::from_value(serde_json::json!("corrupt"));
        assert!(settings.reminders.is_empty());
        assert_eq!(settings.announce.interval_minutes, 60);
        assert!(settings.dnd_defaulted);
    }
}
