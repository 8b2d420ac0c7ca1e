//! Core data model: overlays, their geometry and pointer-space geometry

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::color::HexColor;
use crate::constants::{bounds, ids};
use crate::error::ValidationError;

/// Stable overlay identifier. Never changes once assigned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayId(String);

impl OverlayId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id minted by the store's local token counter
    pub fn local(counter: u64) -> Self {
        Self(format!("{}{counter}", ids::LOCAL_PREFIX))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with(ids::LOCAL_PREFIX)
    }
}

impl fmt::Display for OverlayId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OverlayId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Normalized position, in percent of the container's width and height
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Clamp both axes into the allowed range. Non-finite values collapse to the minimum.
    pub fn clamped(self) -> Self {
        Self {
            x: clamp_axis(self.x),
            y: clamp_axis(self.y),
        }
    }

    pub fn is_within_bounds(&self) -> bool {
        [self.x, self.y]
            .iter()
            .all(|v| v.is_finite() && (bounds::POSITION_MIN..=bounds::POSITION_MAX).contains(v))
    }
}

fn clamp_axis(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(bounds::POSITION_MIN, bounds::POSITION_MAX)
    } else {
        bounds::POSITION_MIN
    }
}

/// Box size in pixels. Only meaningful for text overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    /// Accepts CSS keywords and numeric weights
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "normal" | "400" | "lighter" | "300" => Some(FontWeight::Normal),
            "bold" | "bolder" | "600" | "700" | "800" | "900" => Some(FontWeight::Bold),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

/// The fixed icon set. References from the backend that name no known icon
/// are kept as `Unknown` so they can still be listed and rendered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IconRef {
    Heart,
    Star,
    Trophy,
    Camera,
    Zap,
    Shield,
    Music,
    Bell,
    Unknown(String),
}

impl IconRef {
    pub const ALL: [IconRef; 8] = [
        IconRef::Heart,
        IconRef::Star,
        IconRef::Trophy,
        IconRef::Camera,
        IconRef::Zap,
        IconRef::Shield,
        IconRef::Music,
        IconRef::Bell,
    ];

    /// Case-insensitive lookup by catalog name
    pub fn from_name(name: &str) -> Self {
        Self::ALL
            .iter()
            .find(|icon| icon.name().eq_ignore_ascii_case(name.trim()))
            .cloned()
            .unwrap_or_else(|| IconRef::Unknown(name.to_string()))
    }

    pub fn name(&self) -> &str {
        match self {
            IconRef::Heart => "Heart",
            IconRef::Star => "Star",
            IconRef::Trophy => "Trophy",
            IconRef::Camera => "Camera",
            IconRef::Zap => "Zap",
            IconRef::Shield => "Shield",
            IconRef::Music => "Music",
            IconRef::Bell => "Bell",
            IconRef::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, IconRef::Unknown(_))
    }
}

impl From<String> for IconRef {
    fn from(value: String) -> Self {
        IconRef::from_name(&value)
    }
}

impl From<IconRef> for String {
    fn from(value: IconRef) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for IconRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What an overlay shows. Exactly one of text content or icon per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OverlayKind {
    Text { content: String },
    Icon { icon: IconRef },
}

impl OverlayKind {
    pub fn label(&self) -> &'static str {
        match self {
            OverlayKind::Text { .. } => "text",
            OverlayKind::Icon { .. } => "icon",
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, OverlayKind::Text { .. })
    }
}

/// Explicit styling. Unset fields fall back to kind-specific defaults at render time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OverlayStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<HexColor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size_px: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<HexColor>,
}

impl OverlayStyle {
    /// Style with a color given as a hex string, as typed into an editor form
    pub fn with_color(mut self, color: &str) -> Result<Self, ValidationError> {
        let parsed = HexColor::parse(color).ok_or_else(|| {
            ValidationError::new("style.color", format!("'{color}' is not a hex color"))
        })?;
        self.color = Some(parsed);
        Ok(self)
    }

    pub fn with_font_size(mut self, px: u32) -> Self {
        self.font_size_px = Some(px);
        self
    }

    pub fn with_font_weight(mut self, weight: FontWeight) -> Self {
        self.font_weight = Some(weight);
        self
    }
}

/// A positioned visual element composited over the video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub id: OverlayId,
    pub name: String,
    #[serde(flatten)]
    pub kind: OverlayKind,
    pub position: Position,
    pub size: Size,
    pub style: OverlayStyle,
    pub visible: bool,
    pub z_index: i32,
}

impl Overlay {
    pub fn from_draft(id: OverlayId, draft: OverlayDraft) -> Self {
        Self {
            id,
            name: draft.name,
            kind: draft.kind,
            position: draft.position,
            size: draft.size,
            style: draft.style,
            visible: draft.visible,
            z_index: draft.z_index,
        }
    }

    pub fn to_draft(&self) -> OverlayDraft {
        OverlayDraft {
            name: self.name.clone(),
            kind: self.kind.clone(),
            position: self.position,
            size: self.size,
            style: self.style.clone(),
            visible: self.visible,
            z_index: self.z_index,
        }
    }
}

/// Everything needed to create an overlay, minus the id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayDraft {
    pub name: String,
    #[serde(flatten)]
    pub kind: OverlayKind,
    pub position: Position,
    pub size: Size,
    #[serde(default)]
    pub style: OverlayStyle,
    pub visible: bool,
    pub z_index: i32,
}

impl OverlayDraft {
    pub fn text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: OverlayKind::Text {
                content: content.into(),
            },
            position: Position::new(50.0, 50.0),
            size: Size::new(200, 50),
            style: OverlayStyle::default(),
            visible: true,
            z_index: 1,
        }
    }

    pub fn icon(name: impl Into<String>, icon: IconRef) -> Self {
        Self {
            name: name.into(),
            kind: OverlayKind::Icon { icon },
            position: Position::new(50.0, 50.0),
            size: Size::new(40, 40),
            style: OverlayStyle::default(),
            visible: true,
            z_index: 1,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = z_index;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.size = Size::new(width, height);
        self
    }

    pub fn with_style(mut self, style: OverlayStyle) -> Self {
        self.style = style;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Check every field against its bound, failing on the first violation
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::new("name", "must not be empty"));
        }

        match &self.kind {
            OverlayKind::Text { content } => {
                if content.trim().is_empty() {
                    return Err(ValidationError::new("content", "text overlays need content"));
                }
                check_range("size.width", self.size.width, bounds::TEXT_WIDTH_MIN, bounds::TEXT_WIDTH_MAX)?;
                check_range("size.height", self.size.height, bounds::TEXT_HEIGHT_MIN, bounds::TEXT_HEIGHT_MAX)?;
            }
            OverlayKind::Icon { icon } => {
                if !icon.is_known() {
                    return Err(ValidationError::new(
                        "icon",
                        format!("'{icon}' is not in the icon set"),
                    ));
                }
            }
        }

        for (field, value) in [("position.x", self.position.x), ("position.y", self.position.y)] {
            if !value.is_finite() || !(bounds::POSITION_MIN..=bounds::POSITION_MAX).contains(&value) {
                return Err(ValidationError::new(
                    field,
                    format!(
                        "{value} is outside [{}, {}]",
                        bounds::POSITION_MIN,
                        bounds::POSITION_MAX
                    ),
                ));
            }
        }

        if let Some(px) = self.style.font_size_px {
            check_range("style.font_size_px", px, bounds::FONT_SIZE_MIN, bounds::FONT_SIZE_MAX)?;
        }

        Ok(())
    }
}

fn check_range(field: &'static str, value: u32, min: u32, max: u32) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::new(field, format!("{value} is outside [{min}, {max}]")))
    }
}

/// Partial update. `None` leaves the field untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayPatch {
    pub name: Option<String>,
    pub kind: Option<OverlayKind>,
    pub position: Option<Position>,
    pub size: Option<Size>,
    pub style: Option<OverlayStyle>,
    pub visible: Option<bool>,
    pub z_index: Option<i32>,
}

impl OverlayPatch {
    /// The overlay's fields with this patch laid over them
    pub fn merged_with(&self, overlay: &Overlay) -> OverlayDraft {
        let mut draft = overlay.to_draft();
        if let Some(name) = &self.name {
            draft.name = name.clone();
        }
        if let Some(kind) = &self.kind {
            draft.kind = kind.clone();
        }
        if let Some(position) = self.position {
            draft.position = position;
        }
        if let Some(size) = self.size {
            draft.size = size;
        }
        if let Some(style) = &self.style {
            draft.style = style.clone();
        }
        if let Some(visible) = self.visible {
            draft.visible = visible;
        }
        if let Some(z_index) = self.z_index {
            draft.z_index = z_index;
        }
        draft
    }
}

/// Pointer position in pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.left
            && point.x <= self.left + self.width
            && point.y >= self.top
            && point.y <= self.top + self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_clamped() {
        assert_eq!(Position::new(-5.0, 120.0).clamped(), Position::new(0.0, 95.0));
        assert_eq!(Position::new(f64::NAN, 40.0).clamped(), Position::new(0.0, 40.0));
    }

    #[test]
    fn test_icon_from_name_is_case_insensitive() {
        assert_eq!(IconRef::from_name("heart"), IconRef::Heart);
        assert_eq!(IconRef::from_name("BELL"), IconRef::Bell);
        assert_eq!(IconRef::from_name("Rocket"), IconRef::Unknown("Rocket".to_string()));
    }

    #[test]
    fn test_valid_drafts_pass() {
        assert!(OverlayDraft::text("LIVE", "LIVE").at(10.0, 10.0).validate().is_ok());
        assert!(OverlayDraft::icon("Heart", IconRef::Heart).at(95.0, 0.0).validate().is_ok());
    }

    #[test]
    fn test_validation_names_failing_field() {
        let cases = [
            (OverlayDraft::text("", "x"), "name"),
            (OverlayDraft::text("n", "  "), "content"),
            (OverlayDraft::text("n", "x").at(95.5, 0.0), "position.x"),
            (OverlayDraft::text("n", "x").at(0.0, -1.0), "position.y"),
            (OverlayDraft::text("n", "x").with_size(49, 50), "size.width"),
            (OverlayDraft::text("n", "x").with_size(801, 50), "size.width"),
            (OverlayDraft::text("n", "x").with_size(200, 19), "size.height"),
            (OverlayDraft::text("n", "x").with_size(200, 201), "size.height"),
            (
                OverlayDraft::text("n", "x").with_style(OverlayStyle::default().with_font_size(9)),
                "style.font_size_px",
            ),
            (
                OverlayDraft::text("n", "x").with_style(OverlayStyle::default().with_font_size(49)),
                "style.font_size_px",
            ),
            (OverlayDraft::icon("n", IconRef::Unknown("Rocket".into())), "icon"),
        ];

        for (draft, field) in cases {
            let err = draft.validate().expect_err("draft should be rejected");
            assert_eq!(err.field, field, "unexpected field for {draft:?}");
        }
    }

    #[test]
    fn test_icon_size_is_not_bounded() {
        // Icons size from font size, so the pixel box is ignored
        let draft = OverlayDraft::icon("Star", IconRef::Star).with_size(1, 1);
        assert!(draft.validate().is_ok());
    }

    #[test]
    fn test_style_with_color_rejects_non_hex() {
        let err = OverlayStyle::default().with_color("tomato").unwrap_err();
        assert_eq!(err.field, "style.color");
    }

    #[test]
    fn test_patch_merges_only_set_fields() {
        let overlay = Overlay::from_draft(OverlayId::new("a"), OverlayDraft::text("LIVE", "LIVE"));
        let patch = OverlayPatch {
            visible: Some(false),
            z_index: Some(7),
            ..Default::default()
        };
        let merged = patch.merged_with(&overlay);
        assert_eq!(merged.name, "LIVE");
        assert!(!merged.visible);
        assert_eq!(merged.z_index, 7);
    }
}
