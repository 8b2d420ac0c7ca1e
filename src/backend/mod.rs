//! Remote collaborators: the transcoding backend and the overlay store behind it

pub mod http;
pub mod models;

pub use http::HttpBackend;
pub use models::StreamInfo;

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::overlay::{SyncAck, SyncAction, SyncOp};
use crate::types::Overlay;

/// Stream control endpoints of the transcoding backend
#[async_trait]
pub trait StreamBackend: Send + Sync {
    async fn list_streams(&self) -> Result<Vec<StreamInfo>, RemoteError>;

    /// Returns the backend's id for the new stream
    async fn start_stream(&self, source_url: &str) -> Result<String, RemoteError>;

    /// Whether the stream's playlist can be played yet
    async fn stream_status(&self, stream_id: &str) -> Result<bool, RemoteError>;

    async fn stop_stream(&self, stream_id: &str) -> Result<(), RemoteError>;

    /// Where the player finds the stream's manifest
    fn manifest_url(&self, stream_id: &str) -> String;
}

/// Overlay CRUD endpoints
#[async_trait]
pub trait OverlayBackend: Send + Sync {
    async fn list_overlays(&self) -> Result<Vec<Overlay>, RemoteError>;

    /// Returns the backend id of the stored overlay
    async fn create_overlay(&self, overlay: &Overlay) -> Result<String, RemoteError>;

    /// Returns the stored overlay when the backend echoes it
    async fn update_overlay(
        &self,
        remote_key: &str,
        overlay: &Overlay,
    ) -> Result<Option<Overlay>, RemoteError>;

    async fn delete_overlay(&self, remote_key: &str) -> Result<(), RemoteError>;
}

/// Everything the dashboard talks to
pub trait Backend: StreamBackend + OverlayBackend {}

impl<T: StreamBackend + OverlayBackend> Backend for T {}

/// Send one overlay sync to the backend
pub async fn send_sync<B: OverlayBackend + ?Sized>(
    backend: &B,
    op: &SyncOp,
) -> Result<SyncAck, RemoteError> {
    match &op.action {
        SyncAction::Create { overlay } => backend
            .create_overlay(overlay)
            .await
            .map(|remote_key| SyncAck::Created { remote_key }),
        SyncAction::Update {
            remote_key,
            overlay,
        } => backend
            .update_overlay(remote_key, overlay)
            .await
            .map(|echo| SyncAck::Updated { echo }),
        SyncAction::Delete { remote_key } => backend
            .delete_overlay(remote_key)
            .await
            .map(|()| SyncAck::Deleted),
    }
}
