//! GUI-specific constants for layout, colors and refresh intervals

use egui;

/// Dashboard window dimensions
pub const WINDOW_WIDTH: f32 = 1280.0;
pub const WINDOW_HEIGHT: f32 = 860.0;
pub const WINDOW_MIN_WIDTH: f32 = 900.0;
pub const WINDOW_MIN_HEIGHT: f32 = 600.0;
pub const SIDE_PANEL_WIDTH: f32 = 340.0;

/// Layout spacing
pub const PADDING: f32 = 10.0;
pub const SECTION_SPACING: f32 = 15.0;
pub const ITEM_SPACING: f32 = 8.0;

/// Status colors
pub const STATUS_READY: egui::Color32 = egui::Color32::from_rgb(0, 200, 0);
pub const STATUS_STOPPED: egui::Color32 = egui::Color32::from_rgb(200, 0, 0);
pub const STATUS_STARTING: egui::Color32 = egui::Color32::from_rgb(200, 200, 0);
pub const STATUS_IDLE: egui::Color32 = egui::Color32::from_rgb(150, 150, 150);
pub const ERROR_TEXT: egui::Color32 = egui::Color32::from_rgb(230, 80, 80);

/// Video surface
pub const SURFACE_BACKGROUND: egui::Color32 = egui::Color32::from_rgb(17, 17, 17);
pub const SURFACE_PLACEHOLDER: egui::Color32 = egui::Color32::from_rgb(90, 90, 90);
pub const DRAG_ACCENT: egui::Color32 = egui::Color32::from_rgb(59, 130, 246);
pub const DRAG_BORDER_WIDTH: f32 = 2.0;
pub const DRAG_DASH: f32 = 6.0;
pub const DRAG_GAP: f32 = 4.0;
pub const SHADOW_OFFSET: f32 = 2.0;
pub const SHADOW_COLOR: egui::Color32 = egui::Color32::from_rgba_premultiplied(0, 0, 0, 204);

/// Snapshot polling while nothing else triggers a repaint
pub const REFRESH_INTERVAL_MS: u64 = 100;
