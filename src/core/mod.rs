//! # Core Module
//!
//! Core configuration and shared constants for the deskbell worker.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.2.0
//! - **Toggleable**: false

pub mod config;

// Re-export commonly used items
pub use config::Config;
