//! Compositor - turns the overlay collection into ordered draw instructions
//!
//! Pure: the same overlays always produce the same instructions, and nothing
//! in the collection is touched.

use serde::Serialize;

use crate::color::HexColor;
use crate::constants::{glyphs, style};
use crate::types::{FontWeight, IconRef, Overlay, OverlayId, OverlayKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum DrawSize {
    Fixed { width: u32, height: u32 },
    /// Sized by the content (icons follow their font size)
    Auto,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum DrawContent {
    Text { text: String },
    Glyph { icon: IconRef, glyph: &'static str },
}

/// Final style after kind defaults have been filled in
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedStyle {
    pub color: HexColor,
    pub font_size_px: u32,
    pub font_weight: FontWeight,
    /// `None` means transparent
    pub background: Option<HexColor>,
    /// (vertical, horizontal) pixels
    pub padding: (u32, u32),
    pub corner_radius_px: u32,
    pub text_shadow: &'static str,
    pub border: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawInstruction {
    pub id: OverlayId,
    pub left_percent: f64,
    pub top_percent: f64,
    pub size: DrawSize,
    pub content: DrawContent,
    pub style: ResolvedStyle,
    pub z_index: i32,
    pub dragging: bool,
}

/// Visible overlays, bottom-most first
pub fn render(overlays: &[Overlay]) -> Vec<DrawInstruction> {
    render_frame(overlays, None)
}

/// Like [`render`], with the overlay under an active drag highlighted and
/// painted above everything else
pub fn render_frame(overlays: &[Overlay], dragging: Option<&OverlayId>) -> Vec<DrawInstruction> {
    let mut visible: Vec<&Overlay> = overlays.iter().filter(|o| o.visible).collect();
    // sort_by_key is stable, so equal z-indexes keep collection order
    visible.sort_by_key(|o| o.z_index);

    if let Some(id) = dragging
        && let Some(index) = visible.iter().position(|o| &o.id == id)
    {
        let lifted = visible.remove(index);
        visible.push(lifted);
    }

    visible
        .into_iter()
        .map(|overlay| instruction(overlay, dragging == Some(&overlay.id)))
        .collect()
}

/// Glyph for an icon, falling back for references outside the set
pub fn glyph_for(icon: &IconRef) -> &'static str {
    match icon {
        IconRef::Heart => glyphs::HEART,
        IconRef::Star => glyphs::STAR,
        IconRef::Trophy => glyphs::TROPHY,
        IconRef::Camera => glyphs::CAMERA,
        IconRef::Zap => glyphs::ZAP,
        IconRef::Shield => glyphs::SHIELD,
        IconRef::Music => glyphs::MUSIC,
        IconRef::Bell => glyphs::BELL,
        IconRef::Unknown(_) => glyphs::FALLBACK,
    }
}

fn instruction(overlay: &Overlay, dragging: bool) -> DrawInstruction {
    let (size, content) = match &overlay.kind {
        OverlayKind::Text { content } => (
            DrawSize::Fixed {
                width: overlay.size.width,
                height: overlay.size.height,
            },
            DrawContent::Text {
                text: content.clone(),
            },
        ),
        OverlayKind::Icon { icon } => (
            DrawSize::Auto,
            DrawContent::Glyph {
                icon: icon.clone(),
                glyph: glyph_for(icon),
            },
        ),
    };

    DrawInstruction {
        id: overlay.id.clone(),
        left_percent: overlay.position.x,
        top_percent: overlay.position.y,
        size,
        content,
        style: resolve_style(overlay, dragging),
        z_index: overlay.z_index,
        dragging,
    }
}

fn resolve_style(overlay: &Overlay, dragging: bool) -> ResolvedStyle {
    let is_text = overlay.kind.is_text();
    let explicit = &overlay.style;

    let (default_size, default_background, padding) = if is_text {
        (
            style::TEXT_FONT_SIZE_PX,
            HexColor::parse(style::TEXT_BACKGROUND),
            style::TEXT_PADDING,
        )
    } else {
        (style::ICON_FONT_SIZE_PX, None, style::ICON_PADDING)
    };

    ResolvedStyle {
        color: explicit
            .color
            .or_else(|| HexColor::parse(style::DEFAULT_COLOR))
            .unwrap_or(HexColor::WHITE),
        font_size_px: explicit.font_size_px.unwrap_or(default_size),
        font_weight: explicit.font_weight.unwrap_or_default(),
        background: explicit.background.or(default_background),
        padding,
        corner_radius_px: style::CORNER_RADIUS_PX,
        text_shadow: style::TEXT_SHADOW,
        border: dragging.then_some(style::DRAG_BORDER),
    }
}
