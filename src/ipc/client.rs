//! # IPC Client
//!
//! Unix socket client for UI pages to communicate with the worker.
//!
//! - **Version**: 1.1.0
//! - **Since**: 0.6.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Presence reporting
//! - 1.0.0: Initial client with event stream and command helpers

use crate::ipc::get_socket_path;
use crate::ipc::protocol::{encode_message, PageCommand, WorkerEvent, MAX_FRAME_BYTES};
use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{timeout, Duration};

/// Connection timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Read timeout for events
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// IPC client for a UI page
pub struct IpcClient {
    /// Event receiver channel
    event_rx: mpsc::Receiver<WorkerEvent>,
    /// Command sender channel
    command_tx: mpsc::Sender<PageCommand>,
    /// Connection status
    connected: Arc<RwLock<bool>>,
}

impl IpcClient {
    /// Connect to the worker's IPC server on the configured socket
    pub async fn connect() -> Result<Self> {
        let socket_path = get_socket_path();
        Self::connect_to(&socket_path).await
    }

    /// Connect to an explicit socket path
    pub async fn connect_to(socket_path: &str) -> Result<Self> {
        info!("Connecting to IPC server at {}", socket_path);

        let stream = timeout(CONNECT_TIMEOUT, UnixStream::connect(socket_path))
            .await
            .map_err(|_| anyhow!("Connection timeout"))?
            .map_err(|e| anyhow!("Failed to connect: {}", e))?;

        info!("Connected to IPC server");

        let (event_tx, event_rx) = mpsc::channel(256);
        let (command_tx, command_rx) = mpsc::channel(64);
        let connected = Arc::new(RwLock::new(true));

        // Start the connection handler
        let connected_clone = connected.clone();
        tokio::spawn(async move {
            Self::connection_loop(stream, event_tx, command_rx, connected_clone).await;
        });

        Ok(IpcClient {
            event_rx,
            command_tx,
            connected,
        })
    }

    /// Main connection loop - handles reading events and writing commands
    async fn connection_loop(
        stream: UnixStream,
        event_tx: mpsc::Sender<WorkerEvent>,
        mut command_rx: mpsc::Receiver<PageCommand>,
        connected: Arc<RwLock<bool>>,
    ) {
        let (mut reader, mut writer) = stream.into_split();

        // Spawn command writer task
        let write_connected = connected.clone();
        let write_handle = tokio::spawn(async move {
            while let Some(cmd) = command_rx.recv().await {
                match encode_message(&cmd) {
                    Ok(data) => {
                        if let Err(e) = writer.write_all(&data).await {
                            error!("Failed to write command: {}", e);
                            *write_connected.write().await = false;
                            break;
                        }
                        if let Err(e) = writer.flush().await {
                            error!("Failed to flush command: {}", e);
                            *write_connected.write().await = false;
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to encode command: {}", e);
                    }
                }
            }
        });

        // Event reader loop
        loop {
            // Read length prefix with timeout
            let mut len_buf = [0u8; 4];
            match timeout(READ_TIMEOUT, reader.read_exact(&mut len_buf)).await {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    if e.kind() != std::io::ErrorKind::UnexpectedEof {
                        error!("Read error: {}", e);
                    }
                    break;
                }
                Err(_) => {
                    debug!("Read timeout, connection may be idle");
                    continue;
                }
            }

            let len = u32::from_be_bytes(len_buf) as usize;

            if len > MAX_FRAME_BYTES {
                error!("Message too large: {} bytes", len);
                break;
            }

            // Read message body
            let mut buf = vec![0u8; len];
            if let Err(e) = reader.read_exact(&mut buf).await {
                error!("Failed to read message body: {}", e);
                break;
            }

            // Parse event
            match serde_json::from_slice::<WorkerEvent>(&buf) {
                Ok(event) => {
                    if let WorkerEvent::Heartbeat { timestamp } = &event {
                        debug!("Received heartbeat: {}", timestamp);
                    }

                    if event_tx.send(event).await.is_err() {
                        debug!("Event receiver closed");
                        break;
                    }
                }
                Err(e) => {
                    warn!("Failed to parse event: {}", e);
                }
            }
        }

        *connected.write().await = false;
        write_handle.abort();
        info!("IPC connection closed");
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&mut self) -> Option<WorkerEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub async fn recv(&mut self) -> Option<WorkerEvent> {
        self.event_rx.recv().await
    }

    /// Send a command to the worker
    pub async fn send(&self, cmd: PageCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|e| anyhow!("Failed to send command: {}", e))
    }

    /// Check if connected
    pub async fn is_connected(&self) -> bool {
        *self.connected.read().await
    }

    /// Ask the worker to rebuild all triggers after a reminder edit
    pub async fn request_resync(&self) -> Result<()> {
        self.send(PageCommand::RequestResync).await
    }

    /// Request the current reminder list
    pub async fn get_reminders(&self) -> Result<()> {
        self.send(PageCommand::GetReminders).await
    }

    /// Report this page's presence state for DND evaluation
    pub async fn report_presence(
        &self,
        locked: bool,
        audible: bool,
        fullscreen: bool,
    ) -> Result<()> {
        self.send(PageCommand::ReportPresence {
            locked,
            audible,
            fullscreen,
        })
        .await
    }

    /// Answer a heartbeat
    pub async fn pong(&self, timestamp: i64) -> Result<()> {
        self.send(PageCommand::Pong { timestamp }).await
    }
}

/// Try to connect with retries
pub async fn connect_with_retry(max_attempts: u32, delay: Duration) -> Result<IpcClient> {
    for attempt in 1..=max_attempts {
        match IpcClient::connect().await {
            Ok(client) => return Ok(client),
            Err(e) => {
                if attempt < max_attempts {
                    warn!(
                        "Connection attempt {} failed: {}. Retrying in {:?}...",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                } else {
                    return Err(anyhow!(
                        "Failed to connect after {} attempts: {}",
                        max_attempts,
                        e
                    ));
                }
            }
        }
    }
    unreachable!()
}
