//! Overlay editing engine: store, pointer mapping, dragging and compositing

pub mod compositor;
pub mod coords;
pub mod drag;
pub mod store;

pub use compositor::{DrawContent, DrawInstruction, DrawSize, ResolvedStyle, render, render_frame};
pub use drag::{DragController, DragMove, DragState};
pub use store::{OverlayStore, SyncAck, SyncAction, SyncOp, SyncOutcome};

use crate::color::HexColor;
use crate::types::{FontWeight, IconRef, OverlayDraft, OverlayStyle};

/// Overlays shown when the backend's overlay list cannot be loaded
pub fn demo_overlays() -> Vec<OverlayDraft> {
    vec![
        OverlayDraft::text("Sample Text", "LIVE")
            .at(10.0, 10.0)
            .with_size(100, 40)
            .with_z_index(1)
            .with_style(OverlayStyle {
                color: Some(HexColor::rgba(0xFF, 0, 0, 0xFF)),
                font_size_px: Some(18),
                font_weight: Some(FontWeight::Bold),
                background: None,
            }),
        OverlayDraft::icon("Heart Icon", IconRef::Heart)
            .at(80.0, 80.0)
            .with_z_index(2)
            .with_style(OverlayStyle {
                color: Some(HexColor::rgba(0xFF, 0x69, 0xB4, 0xFF)),
                font_size_px: Some(24),
                ..Default::default()
            }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_overlays_are_valid() {
        for draft in demo_overlays() {
            assert!(draft.validate().is_ok(), "{draft:?}");
        }
    }
}
