//! # IPC Server
//!
//! Unix socket server for the worker to communicate with UI pages.
//! Pages receive worker events (reminder changes, fires, announcements)
//! and send commands (resync requests, presence reports).
//!
//! - **Version**: 1.3.0
//! - **Since**: 0.6.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.3.0: Per-client presence cache backing the DND probe
//! - 1.2.0: GetReminders handled through the command channel
//! - 1.1.0: Heartbeat events
//! - 1.0.0: Initial Unix socket protocol

use crate::features::reminders::PresenceProbe;
use crate::ipc::get_socket_path;
use crate::ipc::protocol::{encode_message, PageCommand, WorkerEvent, MAX_FRAME_BYTES};
use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, RwLock};

/// Maximum number of connected pages
const MAX_CLIENTS: usize = 10;

/// Broadcast channel capacity for events
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Command channel capacity
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Presence state reported by one connected page
#[derive(Debug, Clone, Copy, Default)]
struct PagePresence {
    locked: bool,
    audible: bool,
    fullscreen: bool,
}

/// IPC server handle for the worker
pub struct IpcServer {
    /// Broadcast sender for events to all pages
    event_tx: broadcast::Sender<WorkerEvent>,
    /// Receiver for commands from pages
    command_rx: RwLock<mpsc::Receiver<PageCommand>>,
    /// Sender for commands (used by client handlers)
    command_tx: mpsc::Sender<PageCommand>,
    /// Last presence report per connected page
    presence: DashMap<u64, PagePresence>,
    /// Connected page count
    client_count: RwLock<usize>,
    /// Monotonic id source for connections
    next_client_id: AtomicU64,
}

impl IpcServer {
    /// Create a new IPC server (does not start listening yet)
    pub fn new() -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        IpcServer {
            event_tx,
            command_rx: RwLock::new(command_rx),
            command_tx,
            presence: DashMap::new(),
            client_count: RwLock::new(0),
            next_client_id: AtomicU64::new(1),
        }
    }

    /// Sender half of the event broadcast, for components that emit
    /// events without holding the whole server
    pub fn event_sender(&self) -> broadcast::Sender<WorkerEvent> {
        self.event_tx.clone()
    }

    /// Start the IPC server in a background task on the configured socket
    pub async fn start(self: Arc<Self>) -> Result<()> {
        let socket_path = get_socket_path();
        self.start_on(&socket_path).await
    }

    /// Start the IPC server on an explicit socket path
    pub async fn start_on(self: Arc<Self>, socket_path: &str) -> Result<()> {
        // Remove existing socket file if it exists
        if std::path::Path::new(socket_path).exists() {
            std::fs::remove_file(socket_path)?;
        }

        let listener = UnixListener::bind(socket_path)?;
        info!("IPC server listening on {}", socket_path);

        // Spawn the accept loop
        let server = self.clone();
        tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _addr)) => {
                        let client_count = *server.client_count.read().await;
                        if client_count >= MAX_CLIENTS {
                            warn!(
                                "Maximum IPC clients reached ({}), rejecting connection",
                                MAX_CLIENTS
                            );
                            continue;
                        }

                        *server.client_count.write().await += 1;
                        let client_id = server.next_client_id.fetch_add(1, Ordering::SeqCst);
                        info!("Page connected (total: {})", client_count + 1);

                        let server_clone = server.clone();
                        tokio::spawn(async move {
                            if let Err(e) = server_clone.clone().handle_client(stream, client_id).await {
                                debug!("Client handler ended: {}", e);
                            }
                            server_clone.presence.remove(&client_id);
                            *server_clone.client_count.write().await -= 1;
                            info!("Page disconnected");
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept IPC connection: {}", e);
                    }
                }
            }
        });

        Ok(())
    }

    /// Handle a connected page
    async fn handle_client(self: Arc<Self>, stream: UnixStream, client_id: u64) -> Result<()> {
        let (mut reader, mut writer) = stream.into_split();

        // Subscribe to event broadcast
        let mut event_rx = self.event_tx.subscribe();

        // Spawn writer task for events
        let write_handle = tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(event) => match encode_message(&event) {
                        Ok(data) => {
                            if let Err(e) = writer.write_all(&data).await {
                                debug!("Failed to write to page: {}", e);
                                break;
                            }
                            if let Err(e) = writer.flush().await {
                                debug!("Failed to flush to page: {}", e);
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Failed to encode event: {}", e);
                        }
                    },
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Page lagged behind by {} events", n);
                    }
                }
            }
        });

        // Read commands from the page
        let command_tx = self.command_tx.clone();

        loop {
            // Read length prefix
            let mut len_buf = [0u8; 4];
            if reader.read_exact(&mut len_buf).await.is_err() {
                break;
            }
            let len = u32::from_be_bytes(len_buf) as usize;

            if len > MAX_FRAME_BYTES {
                error!("Message too large from page: {} bytes", len);
                break;
            }

            // Read message body
            let mut buf = vec![0u8; len];
            if reader.read_exact(&mut buf).await.is_err() {
                break;
            }

            // Parse command
            match serde_json::from_slice::<PageCommand>(&buf) {
                Ok(cmd) => {
                    // Presence reports update the cache locally
                    if let PageCommand::ReportPresence {
                        locked,
                        audible,
                        fullscreen,
                    } = &cmd
                    {
                        self.presence.insert(
                            client_id,
                            PagePresence {
                                locked: *locked,
                                audible: *audible,
                                fullscreen: *fullscreen,
                            },
                        );
                        debug!("Presence update from page {client_id}: {cmd:?}");
                        continue;
                    }

                    // Forward command to the worker loop
                    if let Err(e) = command_tx.send(cmd).await {
                        error!("Failed to forward command: {}", e);
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse command from page: {}", e);
                }
            }
        }

        write_handle.abort();
        Ok(())
    }

    /// Broadcast an event to all connected pages. Send failures to pages
    /// that have gone away are swallowed.
    pub fn broadcast(&self, event: WorkerEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Receive the next page command (blocking)
    pub async fn recv_command(&self) -> Option<PageCommand> {
        self.command_rx.write().await.recv().await
    }

    /// Get connected page count
    pub async fn client_count(&self) -> usize {
        *self.client_count.read().await
    }

    /// Send a heartbeat to all pages
    pub fn send_heartbeat(&self) {
        let timestamp = chrono::Utc::now().timestamp();
        self.broadcast(WorkerEvent::Heartbeat { timestamp });
    }
}

impl Default for IpcServer {
    fn default() -> Self {
        Self::new()
    }
}

/// DND presence probe over the per-page reports. A signal is active if
/// any connected page reports it; with no pages connected nothing is
/// suppressed.
pub struct PagePresenceProbe {
    server: Arc<IpcServer>,
}

impl PagePresenceProbe {
    pub fn new(server: Arc<IpcServer>) -> Self {
        PagePresenceProbe { server }
    }
}

#[async_trait]
impl PresenceProbe for PagePresenceProbe {
    async fn is_locked(&self) -> bool {
        self.server.presence.iter().any(|p| p.locked)
    }

    async fn has_audible_playback(&self) -> bool {
        self.server.presence.iter().any(|p| p.audible)
    }

    async fn has_fullscreen_window(&self) -> bool {
        self.server.presence.iter().any(|p| p.fullscreen)
    }
}
