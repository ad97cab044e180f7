//! # Features Layer
//!
//! Feature modules of the deskbell worker. Each feature keeps its own
//! types, storage access, and tests under one directory.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.3.0
//! - **Toggleable**: false

pub mod reminders;

// Re-export feature items for convenient access from the binary
pub use reminders::{Scheduler, TriggerHandler};
