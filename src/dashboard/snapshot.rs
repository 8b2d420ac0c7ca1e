use serde::Serialize;

use crate::backend::StreamInfo;
use crate::overlay::DrawInstruction;
use crate::stream::StreamPhase;
use crate::types::{Overlay, OverlayId};

/// Read-only view of the dashboard published after every handled event
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub overlays: Vec<Overlay>,
    /// Compositor output, bottom-most first
    pub draw: Vec<DrawInstruction>,
    pub phase: StreamPhase,
    pub stream_id: Option<String>,
    pub streams: Vec<StreamInfo>,
    pub status: Option<String>,
    pub error: Option<String>,
    pub dragging: Option<OverlayId>,
}

impl DashboardSnapshot {
    pub fn overlay(&self, id: &OverlayId) -> Option<&Overlay> {
        self.overlays.iter().find(|o| &o.id == id)
    }

    pub fn can_start(&self) -> bool {
        self.phase.can_start()
    }
}
