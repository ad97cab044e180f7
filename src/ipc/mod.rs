//! # IPC Module
//!
//! Inter-process communication between the worker and UI pages.
//!
//! - **Version**: 1.0.0
//! - **Since**: 0.6.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.0.0: Initial IPC implementation with Unix socket protocol

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{connect_with_retry, IpcClient};
pub use protocol::{PageCommand, WorkerEvent};
pub use server::{IpcServer, PagePresenceProbe};

/// Default socket path for IPC communication
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/deskbell.sock";

/// Get the socket path from environment or use default
pub fn get_socket_path() -> String {
    std::env::var("DESKBELL_IPC_SOCKET").unwrap_or_else(|_| DEFAULT_SOCKET_PATH.to_string())
}
