use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info};
use std::sync::Arc;

use deskbell::core::Config;
use deskbell::features::reminders::{
    JsonFileStore, Scheduler, SettingsStore, TriggerHandler,
};
use deskbell::ipc::{IpcServer, PageCommand, PagePresenceProbe, WorkerEvent};
use deskbell::platform::{
    CommandSpeaker, DesktopNotifier, Notifier, SilentSpeaker, Speaker, TokioTriggers,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting deskbell worker...");

    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(&config.settings_path));

    // Start the IPC server for page communication
    let ipc_server = Arc::new(IpcServer::new());
    if let Err(e) = ipc_server.clone().start().await {
        error!("Failed to start IPC server: {e}. Page control will be unavailable.");
    } else {
        info!("📡 IPC server started for page communication");
    }

    // Spawn IPC heartbeat task
    let heartbeat_ipc = ipc_server.clone();
    let heartbeat_secs = config.heartbeat_secs;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(heartbeat_secs));
        loop {
            interval.tick().await;
            heartbeat_ipc.send_heartbeat();
        }
    });

    // Trigger runtime and scheduler
    let (triggers, mut fire_rx) = TokioTriggers::new();
    let triggers = Arc::new(triggers);
    let events = ipc_server.event_sender();
    let scheduler = Arc::new(Scheduler::new(
        store.clone(),
        triggers.clone(),
        events.clone(),
    ));

    // Output sinks
    let notifier: Arc<dyn Notifier> = Arc::new(DesktopNotifier::new());
    let speaker: Arc<dyn Speaker> = match &config.speech_command {
        Some(command) => match CommandSpeaker::from_command_line(command) {
            Ok(speaker) => Arc::new(speaker),
            Err(e) => {
                error!("Invalid speech command {command:?}: {e}. Speech output disabled.");
                Arc::new(SilentSpeaker)
            }
        },
        None => {
            info!("No speech command configured, speech output disabled");
            Arc::new(SilentSpeaker)
        }
    };

    let probe = Arc::new(PagePresenceProbe::new(ipc_server.clone()));
    let handler = Arc::new(TriggerHandler::new(
        store.clone(),
        scheduler.clone(),
        notifier,
        speaker,
        probe,
        events.clone(),
    ));

    // Register triggers for everything already in the record
    scheduler.resync().await;
    info!("Initial resync complete");

    // Fired triggers run outside the command loop so a slow handler
    // never delays the next fire
    let fire_handler = handler.clone();
    tokio::spawn(async move {
        while let Some(name) = fire_rx.recv().await {
            let handler = fire_handler.clone();
            tokio::spawn(async move {
                handler.on_trigger(&name).await;
            });
        }
    });

    // Page command loop
    info!("Worker ready, processing page commands");
    while let Some(cmd) = ipc_server.recv_command().await {
        match cmd {
            PageCommand::RequestResync => {
                debug!("Page requested resync");
                scheduler.resync().await;
            }
            PageCommand::GetReminders => {
                let settings = store.load().await;
                ipc_server.broadcast(WorkerEvent::RemindersChanged {
                    reminders: settings.reminders,
                });
            }
            PageCommand::ReportPresence { .. } => {
                // handled inside the server's client task
            }
            PageCommand::Pong { timestamp } => {
                debug!("Received Pong with timestamp {timestamp}");
            }
        }
    }

    Ok(())
}
