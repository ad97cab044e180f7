//! # IPC Protocol
//!
//! Message types for worker <-> UI page communication over a Unix socket.
//!
//! Uses length-prefixed JSON framing:
//! - 4 bytes: message length (big-endian u32)
//! - N bytes: JSON payload
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.6.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Pages report presence for do-not-disturb evaluation
//! - 1.0.0: Initial protocol with reminder events

use crate::features::reminders::ReminderEntry;
use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

// ============================================================================
// Worker -> Page Events
// ============================================================================

/// Events sent from the worker to connected UI pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum WorkerEvent {
    /// The reminder list changed as a side effect of expiry cleanup or a
    /// fired one-shot; pages refresh their local copy
    RemindersChanged { reminders: Vec<ReminderEntry> },
    /// A reminder trigger fired and was not suppressed
    ReminderFired { reminder: ReminderEntry },
    /// A periodic time announcement happened
    TimeAnnounced { time: DateTime<Local> },
    /// Heartbeat to keep connections alive
    Heartbeat { timestamp: i64 },
}

// ============================================================================
// Page -> Worker Commands
// ============================================================================

/// Commands sent from UI pages to the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageCommand {
    /// The page added, edited, or deleted a reminder; rebuild all triggers
    RequestResync,
    /// Ask for the current reminder list (answered with RemindersChanged)
    GetReminders,
    /// Report this page's presence state for do-not-disturb checks
    ReportPresence {
        locked: bool,
        audible: bool,
        fullscreen: bool,
    },
    /// Heartbeat response
    Pong { timestamp: i64 },
}

// ============================================================================
// Framing - Length-prefixed JSON messages
// ============================================================================

/// Maximum accepted frame size
pub const MAX_FRAME_BYTES: usize = 10 * 1024 * 1024;

/// Encode a message with length prefix
pub fn encode_message<T: Serialize>(msg: &T) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(msg)?;
    let len = json.len() as u32;
    let mut buf = Vec::with_capacity(4 + json.len());
    buf.extend_from_slice(&len.to_be_bytes());
    buf.extend_from_slice(&json);
    Ok(buf)
}

/// Read a length-prefixed message from a reader
pub fn decode_message<T: for<'de> Deserialize<'de>, R: Read>(reader: &mut R) -> Result<T> {
    let mut len_buf = [0u8; 4];
    reader.read_exact(&mut len_buf)?;
    let len = u32::from_be_bytes(len_buf) as usize;

    if len > MAX_FRAME_BYTES {
        return Err(anyhow!("Message too large: {} bytes", len));
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;

    Ok(serde_json::from_slice(&buf)?)
}

/// Write a framed message to a writer
pub fn write_message<T: Serialize, W: Write>(writer: &mut W, msg: &T) -> Result<()> {
    let encoded = encode_message(msg)?;
    writer.write_all(&encoded)?;
    writer.flush()?;
    Ok(())
}
