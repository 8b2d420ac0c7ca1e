//! Playback engine backed by an external player process (ffplay by default)
//!
//! The process is spawned on `load` and watched by a tokio task. Exiting on
//! its own is reported as an [`EngineEvent`]; `destroy` asks it to terminate
//! (SIGTERM, then a kill after a grace period) and silences the watcher.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use super::player::{EngineEvent, EngineEvents, PlaybackEngine, VideoSurface};
use crate::config::PlayerConfig;
use crate::constants::player;
use crate::error::PlaybackError;

#[derive(Debug)]
pub struct ExternalPlayer {
    program: String,
    args: Vec<String>,
    events: EngineEvents,
    /// Bumped on every load and destroy so a stale watcher never reports
    generation: Arc<AtomicU64>,
    running: Option<oneshot::Sender<()>>,
}

impl ExternalPlayer {
    pub fn new(config: &PlayerConfig, events: EngineEvents) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            events,
            generation: Arc::new(AtomicU64::new(0)),
            running: None,
        }
    }

    /// Full argument list for one manifest: configured args with placeholders
    /// expanded, then the manifest URL
    pub fn command_line(&self, manifest_url: &str, surface: &VideoSurface) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{title}", &surface.title)
                    .replace("{width}", &surface.width.to_string())
                    .replace("{height}", &surface.height.to_string())
            })
            .chain(std::iter::once(manifest_url.to_string()))
            .collect()
    }
}

impl PlaybackEngine for ExternalPlayer {
    fn load(&mut self, manifest_url: &str, surface: &VideoSurface) -> Result<(), PlaybackError> {
        self.destroy();

        let args = self.command_line(manifest_url, surface);
        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlaybackError::Engine(format!("failed to spawn '{}': {e}", self.program)))?;

        let pid = child.id();
        info!(program = %self.program, pid = ?pid, manifest = %manifest_url, "Started player process");

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.running = Some(cancel_tx);

        tokio::spawn(watch_player(
            child,
            cancel_rx,
            self.events.clone(),
            Arc::clone(&self.generation),
            generation,
        ));

        // The player reads the manifest itself once running
        self.events.emit(EngineEvent::ManifestParsed);
        Ok(())
    }

    fn play(&mut self) -> Result<(), PlaybackError> {
        if self.running.is_none() {
            return Err(PlaybackError::Engine("no player process".to_string()));
        }
        // External players start on their own
        debug!(program = %self.program, "Player process is playing");
        Ok(())
    }

    fn destroy(&mut self) {
        if let Some(cancel) = self.running.take() {
            self.generation.fetch_add(1, Ordering::SeqCst);
            // Watcher already gone means the process already exited
            let _ = cancel.send(());
        }
    }
}

impl Drop for ExternalPlayer {
    fn drop(&mut self) {
        self.destroy();
    }
}

async fn watch_player(
    mut child: Child,
    cancel: oneshot::Receiver<()>,
    events: EngineEvents,
    current: Arc<AtomicU64>,
    generation: u64,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = cancel => None,
    };
    let Some(status) = exited else {
        terminate(&mut child).await;
        return;
    };

    if current.load(Ordering::SeqCst) != generation {
        return;
    }
    match status {
        Ok(status) if status.success() => {
            info!("Player process exited");
            events.emit(EngineEvent::Ended);
        }
        Ok(status) => {
            warn!(exit = ?status.code(), "Player process failed");
            events.emit(EngineEvent::Error {
                fatal: true,
                details: format!("player exited with {status}"),
            });
        }
        Err(err) => {
            error!(error = ?err, "Failed to wait for player process");
            events.emit(EngineEvent::Error {
                fatal: true,
                details: err.to_string(),
            });
        }
    }
}

/// SIGTERM first so the player can close its window, kill if it lingers
async fn terminate(child: &mut Child) {
    let grace = Duration::from_millis(player::TERMINATE_GRACE_MS);

    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match i32::try_from(pid) {
                Ok(raw) => {
                    if let Err(err) = kill(Pid::from_raw(raw), Signal::SIGTERM) {
                        debug!(pid, error = %err, "SIGTERM to player failed");
                    }
                }
                Err(_) => warn!(pid, "Player pid out of range"),
            }

            if let Ok(status) = tokio::time::timeout(grace, child.wait()).await {
                debug!(pid, status = ?status.map(|s| s.code()), "Player process terminated");
                return;
            }
            warn!(pid, "Player ignored SIGTERM, killing");
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(err) = child.kill().await {
        debug!(error = %err, "Killing player process failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn config(program: &str, args: &[&str]) -> PlayerConfig {
        PlayerConfig {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    fn recorder() -> (EngineEvents, Arc<Mutex<Vec<EngineEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (EngineEvents::new(move |e| sink.lock().unwrap().push(e)), seen)
    }

    #[test]
    fn test_command_line_expands_surface_placeholders() {
        let player = ExternalPlayer::new(&PlayerConfig::default(), EngineEvents::discard());
        let surface = VideoSurface {
            title: "cam".to_string(),
            width: 640,
            height: 360,
        };
        let args = player.command_line("http://h/s/playlist.m3u8", &surface);

        assert_eq!(args.last().map(String::as_str), Some("http://h/s/playlist.m3u8"));
        assert!(args.windows(2).any(|w| w == ["-window_title", "cam"]));
        assert!(args.windows(2).any(|w| w == ["-x", "640"]));
        assert!(args.windows(2).any(|w| w == ["-y", "360"]));
    }

    #[tokio::test]
    async fn test_missing_program_fails_load() {
        let mut player = ExternalPlayer::new(
            &config("/nonexistent/livedeck-player", &[]),
            EngineEvents::discard(),
        );
        let result = player.load("http://h/a.m3u8", &VideoSurface::default());
        assert!(matches!(result, Err(PlaybackError::Engine(_))));
        assert!(player.play().is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failing_process_reports_fatal_error() {
        let (events, seen) = recorder();
        let mut player = ExternalPlayer::new(&config("sh", &["-c", "exit 3"]), events);
        player.load("ignored", &VideoSurface::default()).unwrap();

        for _ in 0..100 {
            if seen.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen[0], EngineEvent::ManifestParsed);
        assert!(matches!(seen[1], EngineEvent::Error { fatal: true, .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_clean_exit_reports_ended() {
        let (events, seen) = recorder();
        let mut player = ExternalPlayer::new(&config("true", &[]), events);
        player.load("ignored", &VideoSurface::default()).unwrap();

        for _ in 0..100 {
            if seen.lock().unwrap().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec![EngineEvent::ManifestParsed, EngineEvent::Ended]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_destroy_is_silent() {
        let (events, seen) = recorder();
        let mut player = ExternalPlayer::new(&config("sleep", &[]), events);
        player.load("30", &VideoSurface::default()).unwrap();
        player.destroy();

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(seen.lock().unwrap().clone(), vec![EngineEvent::ManifestParsed]);
    }
}
