//! Drag Controller - moves one overlay at a time with the pointer

use tracing::debug;

use super::coords;
use super::store::{OverlayStore, SyncAction, SyncOp};
use crate::error::StoreError;
use crate::types::{OverlayId, Point, Position, Rect};

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        id: OverlayId,
        /// Pointer position relative to the element's top-left corner at press time
        offset: Point,
    },
}

/// Outcome of one pointer move
#[derive(Debug, Clone, PartialEq)]
pub struct DragMove {
    pub position: Position,
    /// Write to send right away instead of on release. Only set when the
    /// overlay has no backend copy and the move re-issued its create.
    pub send_now: Option<SyncOp>,
}

/// Press / move / release state for overlay dragging.
/// Position is saved locally on every move; the backend hears about it once, on release.
#[derive(Debug, Default)]
pub struct DragController {
    state: DragState,
    pending_sync: Option<SyncOp>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Overlay currently under the pointer, if a gesture is active
    pub fn active(&self) -> Option<&OverlayId> {
        match &self.state {
            DragState::Dragging { id, .. } => Some(id),
            DragState::Idle => None,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.active().is_some()
    }

    /// Pointer pressed on a rendered overlay. Ignored while another gesture is active.
    pub fn begin(&mut self, id: OverlayId, pointer: Point, element: Rect) -> bool {
        if let DragState::Dragging { id: current, .. } = &self.state {
            debug!(overlay = %id, dragging = %current, "Ignoring press during active drag");
            return false;
        }

        let offset = Point::new(pointer.x - element.left, pointer.y - element.top);
        debug!(overlay = %id, dx = offset.x, dy = offset.y, "Drag started");
        self.state = DragState::Dragging { id, offset };
        self.pending_sync = None;
        true
    }

    /// Pointer moved anywhere while dragging. Returns the overlay's new position,
    /// or `None` when idle or when the target vanished (which ends the gesture).
    pub fn move_to(
        &mut self,
        pointer: Point,
        container: Rect,
        store: &mut OverlayStore,
    ) -> Option<DragMove> {
        let DragState::Dragging { id, offset } = &self.state else {
            return None;
        };

        let corner = Point::new(pointer.x - offset.x, pointer.y - offset.y);
        let position = coords::to_percent(corner, container);

        match store.set_position(id, position) {
            Ok((overlay, sync)) => {
                let send_now = match sync {
                    // The store follows up with the final position once this create confirms
                    Some(op) if matches!(op.action, SyncAction::Create { .. }) => Some(op),
                    Some(op) => {
                        self.pending_sync = Some(op);
                        None
                    }
                    // Create in flight; its confirmation carries the newest position
                    None => None,
                };
                Some(DragMove {
                    position: overlay.position,
                    send_now,
                })
            }
            Err(StoreError::NotFound(_)) | Err(StoreError::Validation(_)) => {
                debug!(overlay = %id, "Drag target gone, ending gesture");
                self.state = DragState::Idle;
                self.pending_sync = None;
                None
            }
        }
    }

    /// Pointer released. Hands back the one sync that carries the final position.
    pub fn end(&mut self) -> Option<SyncOp> {
        if let DragState::Dragging { id, .. } = std::mem::take(&mut self.state) {
            debug!(overlay = %id, "Drag ended");
        }
        self.pending_sync.take()
    }

    /// Drop the gesture without syncing. Local moves already made stay.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle;
        self.pending_sync = None;
    }
}
