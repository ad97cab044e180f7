// Core layer - shared configuration
pub mod core;

// Features layer - all feature modules
pub mod features;

// Platform layer - trigger runtime and output sinks
pub mod platform;

// IPC layer - communication between the worker and UI pages
pub mod ipc;

// Re-export core config for convenient access
pub use core::Config;

// Re-export feature items for convenient access
pub use features::reminders::{
    JsonFileStore, ReminderEntry, ReminderKind, Scheduler, Settings, SettingsStore,
    TriggerHandler,
};

// Re-export IPC items
pub use ipc::{IpcClient, IpcServer, PageCommand, WorkerEvent};
