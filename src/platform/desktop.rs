//! # Desktop Output Sinks
//!
//! Notification and speech sinks shared by every output path in the
//! worker. Both the reminder and announcement handlers talk to these
//! traits only, so tests can swap in recording fakes.
//!
//! - **Version**: 1.2.0
//! - **Since**: 1.0.0
//! - **Toggleable**: false
//!
//! ## Changelog
//! - 1.2.0: Track notification handles so sticky notifications can be cleared
//! - 1.1.0: External synthesizer command for speech output
//! - 1.0.0: Initial notify-rust integration

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::debug;
use uuid::Uuid;

#[cfg(all(unix, not(target_os = "macos")))]
use std::collections::HashMap;
#[cfg(all(unix, not(target_os = "macos")))]
use tokio::sync::Mutex;

/// Desktop notification sink. Notifications are sticky (no platform
/// timeout); the trigger handler clears them itself after five minutes.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a notification and return an opaque id for later clearing
    async fn notify(&self, title: &str, body: &str) -> Result<String>;

    /// Clear a previously shown notification. Returns true if it was
    /// still present, false if the user had already dismissed it.
    async fn clear(&self, id: &str) -> Result<bool>;
}

/// Speech output sink
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}

/// System-tray notification sink backed by notify-rust
pub struct DesktopNotifier {
    #[cfg(all(unix, not(target_os = "macos")))]
    handles: Mutex<HashMap<String, notify_rust::NotificationHandle>>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        DesktopNotifier {
            #[cfg(all(unix, not(target_os = "macos")))]
            handles: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<String> {
        let id = Uuid::new_v4().to_string();

        // macOS rejects the icon hint on some versions
        #[cfg(target_os = "macos")]
        let shown = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .timeout(notify_rust::Timeout::Never)
            .show();

        #[cfg(not(target_os = "macos"))]
        let shown = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .icon("appointment-soon")
            .timeout(notify_rust::Timeout::Never)
            .show();

        match shown {
            Ok(_handle) => {
                #[cfg(all(unix, not(target_os = "macos")))]
                self.handles.lock().await.insert(id.clone(), _handle);
                debug!("Showed notification {id}: {title}");
                Ok(id)
            }
            Err(e) => Err(anyhow!("failed to show notification: {e}")),
        }
    }

    async fn clear(&self, id: &str) -> Result<bool> {
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            match self.handles.lock().await.remove(id) {
                Some(handle) => {
                    handle.close();
                    debug!("Cleared notification {id}");
                    Ok(true)
                }
                None => Ok(false),
            }
        }
        #[cfg(not(all(unix, not(target_os = "macos"))))]
        {
            // No close support on this platform
            let _ = id;
            Ok(false)
        }
    }
}

/// Speech sink that shells out to an external synthesizer, e.g.
/// `espeak-ng -v en`. The text to speak is appended as the final argument.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    /// Split a configured command line on whitespace. Quoting is not
    /// supported; synthesizer flags never need it in practice.
    pub fn from_command_line(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(String::from);
        let program = parts
            .next()
            .ok_or_else(|| anyhow!("empty speech command"))?;
        Ok(CommandSpeaker {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .output()
            .await
            .map_err(|e| anyhow!("failed to run {}: {e}", self.program))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}",
                self.program,
                output.status
            ));
        }
        debug!("Spoke: {text}");
        Ok(())
    }
}

/// Speaker used when no synthesizer command is configured
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        debug!("Speech disabled, dropping: {text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_speaker_parsing() {
        let speaker = CommandSpeaker::from_command_line("espeak-ng -v en -s 150").unwrap();
        assert_eq!(speaker.program, "espeak-ng");
        assert_eq!(speaker.args, vec!["-v", "en", "-s", "150"]);

        assert!(CommandSpeaker::from_command_line("   ").is_err());
    }

    #[tokio::test]
    async fn test_silent_speaker_always_succeeds() {
        assert!(SilentSpeaker.speak("anything").await.is_ok());
    }
}
