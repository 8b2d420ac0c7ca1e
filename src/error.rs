//! Error taxonomy for the dashboard core
//!
//! Validation and lookup failures are reported straight back to the caller and
//! never mutate state. Remote failures are either swallowed after an optimistic
//! local update (overlays) or surfaced to the operator (stream start/stop).

use thiserror::Error;

use crate::stream::StreamPhase;
use crate::types::OverlayId;

/// An overlay field is outside its allowed bound
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Failures of Overlay Store operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("overlay {0} not found")]
    NotFound(OverlayId),
}

/// Failures talking to the backend collaborator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network or transport failure, or an unreadable response
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with a non-success status and an error body
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The configured API base cannot be turned into request URLs
    #[error("invalid backend endpoint: {0}")]
    InvalidEndpoint(String),
}

impl RemoteError {
    /// True when the failure came from the transport rather than the backend
    pub fn is_unavailable(&self) -> bool {
        matches!(self, RemoteError::Unavailable(_))
    }
}

/// Rejected Stream Lifecycle Controller requests
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("source URL is empty")]
    EmptySourceUrl,

    #[error("a stream session is already active ({0:?})")]
    SessionActive(StreamPhase),

    #[error("no active stream session")]
    NoActiveSession,
}

/// Playback engine failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    /// Unrecoverable playback error reported by the engine
    #[error("fatal playback error: {0}")]
    Fatal(String),

    /// Playback finished on its own, e.g. the player window was closed
    #[error("player closed")]
    Ended,

    /// The engine could not be driven (spawn failure, bad source)
    #[error("playback engine error: {0}")]
    Engine(String),
}
