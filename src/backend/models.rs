//! Backend JSON shapes and their conversion to the core data model

use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::color::HexColor;
use crate::types::{
    FontWeight, IconRef, Overlay, OverlayId, OverlayKind, OverlayStyle, Position, Size,
};

/// One entry of `GET /streams`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub stream_id: String,
    #[serde(default)]
    pub rtsp_url: Option<String>,
    #[serde(default)]
    pub is_running: bool,
    #[serde(default)]
    pub playlist_ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct StreamListResponse {
    #[serde(default)]
    pub streams: Vec<StreamInfo>,
}

#[derive(Debug, Serialize)]
pub struct StartRequest<'a> {
    pub rtsp_url: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct StartResponse {
    pub stream_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub playlist_ready: bool,
}

#[derive(Debug, Deserialize)]
pub struct OverlayListResponse {
    #[serde(default)]
    pub overlays: Vec<WireOverlay>,
}

/// Body of overlay create and update responses
#[derive(Debug, Deserialize)]
pub struct OverlayResponse {
    #[serde(default)]
    pub overlay: Option<WireOverlay>,
}

/// Non-2xx response body
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Overlay as the backend stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireOverlay {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub position: WirePoint,
    #[serde(default = "WireSize::icon_default")]
    pub size: WireSize,
    #[serde(default)]
    pub style: WireStyle,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default = "default_z_index")]
    pub z_index: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireSize {
    pub width: f64,
    pub height: f64,
}

impl WireSize {
    fn icon_default() -> Self {
        Self {
            width: 40.0,
            height: 40.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WireStyle {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(
        rename = "fontSize",
        default,
        deserialize_with = "font_size_px",
        serialize_with = "font_size_css",
        skip_serializing_if = "Option::is_none"
    )]
    pub font_size: Option<u32>,
    #[serde(rename = "fontWeight", default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

fn default_visible() -> bool {
    true
}

fn default_z_index() -> i32 {
    1
}

/// Accepts `"18px"`, `"18"` or `18`
fn font_size_px<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Number(n)) if n.is_finite() && n >= 0.0 => Some(n.round() as u32),
        Some(Raw::Text(text)) => {
            let digits = text.trim().trim_end_matches("px").trim();
            digits
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n.round() as u32)
        }
        _ => None,
    })
}

fn font_size_css<S: serde::Serializer>(size: &Option<u32>, serializer: S) -> Result<S::Ok, S::Error> {
    match size {
        Some(px) => serializer.serialize_str(&format!("{px}px")),
        None => serializer.serialize_none(),
    }
}

fn pixels(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

impl WireOverlay {
    /// Convert to the core model. Entries without an id cannot be addressed
    /// later and are skipped.
    pub fn into_overlay(self) -> Option<Overlay> {
        let Some(id) = self.id else {
            warn!(name = %self.name, "Skipping overlay without an id");
            return None;
        };

        let kind = if self.kind.eq_ignore_ascii_case("icon") {
            OverlayKind::Icon {
                icon: IconRef::from_name(self.icon.as_deref().unwrap_or_default()),
            }
        } else {
            OverlayKind::Text {
                content: self.content,
            }
        };

        let style = OverlayStyle {
            color: self.style.color.as_deref().and_then(HexColor::parse),
            font_size_px: self.style.font_size,
            font_weight: self.style.font_weight.as_deref().and_then(FontWeight::parse),
            background: self.style.background.as_deref().and_then(HexColor::parse),
        };

        Some(Overlay {
            id: OverlayId::new(id),
            name: self.name,
            kind,
            position: Position::new(self.position.x, self.position.y).clamped(),
            size: Size::new(pixels(self.size.width), pixels(self.size.height)),
            style,
            visible: self.visible,
            z_index: self.z_index,
        })
    }

    /// Wire form of a local overlay. `remote_key` is the backend id, when known.
    pub fn from_overlay(overlay: &Overlay, remote_key: Option<&str>) -> Self {
        let (kind, content, icon) = match &overlay.kind {
            OverlayKind::Text { content } => ("text", content.clone(), None),
            OverlayKind::Icon { icon } => ("icon", String::new(), Some(icon.name().to_string())),
        };

        Self {
            id: remote_key.map(str::to_string),
            name: overlay.name.clone(),
            kind: kind.to_string(),
            content,
            icon,
            position: WirePoint {
                x: overlay.position.x,
                y: overlay.position.y,
            },
            size: WireSize {
                width: f64::from(overlay.size.width),
                height: f64::from(overlay.size.height),
            },
            style: WireStyle {
                color: overlay.style.color.map(|c| c.to_string()),
                font_size: overlay.style.font_size_px,
                font_weight: overlay.style.font_weight.map(|w| w.as_str().to_string()),
                background: overlay.style.background.map(|c| c.to_string()),
            },
            visible: overlay.visible,
            z_index: overlay.z_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backend_overlay_parses() {
        let wire: WireOverlay = serde_json::from_value(json!({
            "_id": "65a1",
            "name": "Sample Text",
            "type": "text",
            "content": "LIVE",
            "position": {"x": 10, "y": 10},
            "size": {"width": 100, "height": 40},
            "style": {"color": "#ff0000", "fontSize": "18px", "fontWeight": "bold"},
            "visible": true,
            "z_index": 1,
            "created_at": "Mon, 01 Jan 2024 00:00:00 GMT"
        }))
        .unwrap();

        let overlay = wire.into_overlay().unwrap();
        assert_eq!(overlay.id.as_str(), "65a1");
        assert_eq!(overlay.kind, OverlayKind::Text { content: "LIVE".into() });
        assert_eq!(overlay.size, Size::new(100, 40));
        assert_eq!(overlay.style.font_size_px, Some(18));
        assert_eq!(overlay.style.font_weight, Some(FontWeight::Bold));
        assert_eq!(overlay.style.color, HexColor::parse("#ff0000"));
    }

    #[test]
    fn test_font_size_forms() {
        for (raw, expected) in [
            (json!("18px"), Some(18)),
            (json!("24"), Some(24)),
            (json!(16), Some(16)),
            (json!("large"), None),
            (json!(null), None),
        ] {
            let style: WireStyle = serde_json::from_value(json!({ "fontSize": raw })).unwrap();
            assert_eq!(style.font_size, expected, "fontSize {raw}");
        }
    }

    #[test]
    fn test_icon_overlay_with_unknown_icon() {
        let wire: WireOverlay = serde_json::from_value(json!({
            "_id": "2",
            "name": "Rocket",
            "type": "icon",
            "icon": "Rocket",
            "position": {"x": 120, "y": 80}
        }))
        .unwrap();

        let overlay = wire.into_overlay().unwrap();
        assert_eq!(
            overlay.kind,
            OverlayKind::Icon {
                icon: IconRef::Unknown("Rocket".into())
            }
        );
        // Out-of-range positions are clamped on the way in
        assert_eq!(overlay.position, Position::new(95.0, 80.0));
        assert!(overlay.visible);
        assert_eq!(overlay.z_index, 1);
    }

    #[test]
    fn test_outgoing_body_uses_backend_names() {
        let overlay = Overlay::from_draft(
            OverlayId::new("local-1"),
            crate::types::OverlayDraft::icon("Heart", IconRef::Heart)
                .with_style(OverlayStyle::default().with_font_size(24)),
        );
        let body = serde_json::to_value(WireOverlay::from_overlay(&overlay, None)).unwrap();

        assert_eq!(body["type"], "icon");
        assert_eq!(body["icon"], "Heart");
        assert_eq!(body["style"]["fontSize"], "24px");
        assert_eq!(body["z_index"], 1);
        assert!(body.get("_id").is_none());

        let body = serde_json::to_value(WireOverlay::from_overlay(&overlay, Some("abc"))).unwrap();
        assert_eq!(body["_id"], "abc");
    }

    #[test]
    fn test_overlay_without_id_is_skipped() {
        let wire: WireOverlay = serde_json::from_value(json!({
            "name": "x", "type": "text", "content": "x", "position": {"x": 0, "y": 0}
        }))
        .unwrap();
        assert!(wire.into_overlay().is_none());
    }
}
