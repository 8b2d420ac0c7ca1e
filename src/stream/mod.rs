//! Stream lifecycle: start, readiness polling, playback and teardown

pub mod controller;
pub mod external;
pub mod player;

pub use controller::{
    PollSettings, SessionId, StreamCommand, StreamController, StreamEvent, StreamPhase,
};
pub use external::ExternalPlayer;
pub use player::{EngineEvent, EngineEvents, PlaybackEngine, PlayerAdapter, VideoSurface};
