//! # Trigger Runtime
//!
//! Named timed triggers backed by tokio timer tasks. The scheduler owns
//! the entire trigger namespace: every resync wipes the table and
//! recreates one trigger per reminder, so the runtime never diffs.
//!
//! - **Version**: 1.1.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.1.0: Repeating triggers re-arm from their own task
//! - 1.0.0: Initial tokio-task implementation

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Local};
use dashmap::DashMap;
use log::{debug, warn};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A single trigger registration: fire `name` at `fire_at`, and every
/// `repeat` after that if set.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerSpec {
    pub name: String,
    pub fire_at: DateTime<Local>,
    pub repeat: Option<Duration>,
}

/// Sink for trigger registrations. The worker installs [`TokioTriggers`];
/// scheduler tests install a recording fake.
#[async_trait]
pub trait TriggerSink: Send + Sync {
    /// Drop every registered trigger. The subsystem owns the whole
    /// namespace, so there is nothing to preserve.
    async fn clear_all(&self) -> Result<()>;

    /// Register one trigger. Replaces any existing trigger of the same name.
    async fn create(&self, spec: TriggerSpec) -> Result<()>;
}

/// Tokio-backed trigger runtime. Each trigger is a spawned task that
/// sleeps until its fire time and then pushes the trigger name into the
/// worker's fire channel.
pub struct TokioTriggers {
    fire_tx: mpsc::UnboundedSender<String>,
    tasks: DashMap<String, JoinHandle<()>>,
}

impl TokioTriggers {
    /// Create a runtime together with the receiving end of the fire channel
    pub fn new() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (fire_tx, fire_rx) = mpsc::unbounded_channel();
        (
            TokioTriggers {
                fire_tx,
                tasks: DashMap::new(),
            },
            fire_rx,
        )
    }

    /// Number of currently registered triggers
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TriggerSink for TokioTriggers {
    async fn clear_all(&self) -> Result<()> {
        let mut cleared = 0usize;
        self.tasks.retain(|_, handle| {
            handle.abort();
            cleared += 1;
            false
        });
        debug!("Cleared {cleared} trigger(s)");
        Ok(())
    }

    async fn create(&self, spec: TriggerSpec) -> Result<()> {
        let name = spec.name.clone();
        let fire_tx = self.fire_tx.clone();

        let initial_delay = spec
            .fire_at
            .signed_duration_since(Local::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            if fire_tx.send(task_name.clone()).is_err() {
                return;
            }
            if let Some(period) = spec.repeat {
                loop {
                    tokio::time::sleep(period).await;
                    if fire_tx.send(task_name.clone()).is_err() {
                        return;
                    }
                }
            }
        });

        if let Some(previous) = self.tasks.insert(name.clone(), handle) {
            warn!("Replaced existing trigger {name}");
            previous.abort();
        }
        debug!(
            "Registered trigger {} firing at {} (repeat: {:?})",
            name,
            spec.fire_at.format("%Y-%m-%d %H:%M:%S"),
            spec.repeat
        );
        Ok(())
    }
}
