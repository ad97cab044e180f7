//! # Platform Layer
//!
//! Trait seams for everything the reminder subsystem asks the host
//! platform to do: timed triggers, desktop notifications, and speech.
//! The worker wires in the real implementations; tests inject fakes.
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false

pub mod desktop;
pub mod triggers;

pub use desktop::{CommandSpeaker, DesktopNotifier, Notifier, SilentSpeaker, Speaker};
pub use triggers::{TokioTriggers, TriggerSink, TriggerSpec};
