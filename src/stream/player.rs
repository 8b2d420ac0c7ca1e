//! Player Adapter - narrow seam over the adaptive-streaming playback engine

use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::constants::surface;
use crate::error::PlaybackError;

/// Events a playback engine reports asynchronously
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// The manifest was read and playback can begin
    ManifestParsed,
    Error { fatal: bool, details: String },
    /// Playback stopped cleanly without being asked to
    Ended,
}

/// Where engine events are delivered. Cheap to clone into engine tasks.
#[derive(Clone)]
pub struct EngineEvents(Arc<dyn Fn(EngineEvent) + Send + Sync>);

impl EngineEvents {
    pub fn new(sink: impl Fn(EngineEvent) + Send + Sync + 'static) -> Self {
        Self(Arc::new(sink))
    }

    /// Sink that drops every event
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    pub fn emit(&self, event: EngineEvent) {
        (self.0)(event)
    }
}

impl fmt::Debug for EngineEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EngineEvents")
    }
}

/// The single video surface playback renders into
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSurface {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for VideoSurface {
    fn default() -> Self {
        Self {
            title: surface::TITLE.to_string(),
            width: surface::DEFAULT_WIDTH,
            height: surface::DEFAULT_HEIGHT,
        }
    }
}

/// A concrete playback engine
pub trait PlaybackEngine: Send {
    /// Bind to a manifest and surface. Progress arrives later as [`EngineEvent`]s.
    fn load(&mut self, manifest_url: &str, surface: &VideoSurface) -> Result<(), PlaybackError>;

    fn play(&mut self) -> Result<(), PlaybackError>;

    /// Release everything tied to the current manifest
    fn destroy(&mut self);
}

/// Owns the engine and guarantees at most one attachment at a time
#[derive(Debug)]
pub struct PlayerAdapter<E> {
    engine: E,
    surface: VideoSurface,
    attached: Option<String>,
}

impl<E: PlaybackEngine> PlayerAdapter<E> {
    pub fn new(engine: E, surface: VideoSurface) -> Self {
        Self {
            engine,
            surface,
            attached: None,
        }
    }

    /// Tear down any previous attachment, then bind to `manifest_url`
    pub fn attach(&mut self, manifest_url: &str) -> Result<(), PlaybackError> {
        self.detach();
        self.engine.load(manifest_url, &self.surface)?;
        info!(manifest = %manifest_url, "Player attached");
        self.attached = Some(manifest_url.to_string());
        Ok(())
    }

    /// No-op when nothing is attached
    pub fn detach(&mut self) {
        if let Some(manifest) = self.attached.take() {
            self.engine.destroy();
            info!(manifest = %manifest, "Player detached");
        }
    }

    /// React to an engine event. A fatal error comes back as
    /// [`PlaybackError::Fatal`]; everything else is handled here.
    pub fn handle_engine_event(&mut self, event: EngineEvent) -> Result<(), PlaybackError> {
        if self.attached.is_none() {
            debug!(?event, "Ignoring engine event while detached");
            return Ok(());
        }

        match event {
            EngineEvent::ManifestParsed => {
                if let Err(err) = self.engine.play() {
                    warn!(error = %err, "Playback did not start");
                }
                Ok(())
            }
            EngineEvent::Error { fatal: true, details } => Err(PlaybackError::Fatal(details)),
            EngineEvent::Error { fatal: false, details } => {
                warn!(details = %details, "Recoverable playback error");
                Ok(())
            }
            EngineEvent::Ended => {
                self.detach();
                Err(PlaybackError::Ended)
            }
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn manifest_url(&self) -> Option<&str> {
        self.attached.as_deref()
    }

    pub fn surface(&self) -> &VideoSurface {
        &self.surface
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }
}
