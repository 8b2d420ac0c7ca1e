//! Everything that can wake the dashboard loop

use crate::backend::StreamInfo;
use crate::error::RemoteError;
use crate::overlay::{SyncAck, SyncOp};
use crate::stream::{EngineEvent, StreamEvent};
use crate::types::{Overlay, OverlayDraft, OverlayId, OverlayPatch, Point, Position, Rect};

/// Operator requests posted from outside the loop (GUI, signal handler)
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardCommand {
    StartStream { source_url: String },
    /// Stop a backend stream by id, active or not
    StopStream { stream_id: String },
    StopActive,
    RefreshStreams,
    LoadOverlays,
    CreateOverlay(OverlayDraft),
    UpdateOverlay { id: OverlayId, patch: OverlayPatch },
    DeleteOverlay(OverlayId),
    SetVisible { id: OverlayId, visible: bool },
    SetPosition { id: OverlayId, position: Position },
    Reorder { id: OverlayId, z_index: i32 },
    BeginDrag { id: OverlayId, pointer: Point, element: Rect },
    DragTo { pointer: Point, container: Rect },
    EndDrag,
    CancelDrag,
    ClearError,
}

#[derive(Debug)]
pub enum DashboardEvent {
    Command(DashboardCommand),
    /// Backend answers and timer ticks for the stream lifecycle
    Stream(StreamEvent),
    /// Raw playback engine notification
    Player(EngineEvent),
    OverlaySynced {
        op: SyncOp,
        result: Result<SyncAck, RemoteError>,
    },
    OverlaysLoaded(Result<Vec<Overlay>, RemoteError>),
    StreamsListed(Result<Vec<StreamInfo>, RemoteError>),
    Shutdown,
}

impl From<DashboardCommand> for DashboardEvent {
    fn from(command: DashboardCommand) -> Self {
        DashboardEvent::Command(command)
    }
}
