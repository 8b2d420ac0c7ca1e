//! Video surface: paints the compositor output and turns mouse drags into
//! drag commands

use eframe::egui;

use crate::color::HexColor;
use crate::dashboard::{DashboardCommand, DashboardSnapshot};
use crate::gui::constants::*;
use crate::overlay::{DrawContent, DrawInstruction, DrawSize};
use crate::types::{FontWeight, OverlayId, Point, Rect};

/// One instruction placed on screen
struct Placed<'a> {
    instruction: &'a DrawInstruction,
    rect: egui::Rect,
    galley: std::sync::Arc<egui::Galley>,
}

fn color32(color: HexColor) -> egui::Color32 {
    egui::Color32::from_rgba_unmultiplied(color.r, color.g, color.b, color.a)
}

fn to_rect(rect: egui::Rect) -> Rect {
    Rect::new(
        f64::from(rect.left()),
        f64::from(rect.top()),
        f64::from(rect.width()),
        f64::from(rect.height()),
    )
}

fn to_point(pos: egui::Pos2) -> Point {
    Point::new(f64::from(pos.x), f64::from(pos.y))
}

fn label(content: &DrawContent) -> &str {
    match content {
        DrawContent::Text { text } => text,
        DrawContent::Glyph { glyph, .. } => glyph,
    }
}

/// Screen rect of an instruction whose content measures `content_size`
fn place(instruction: &DrawInstruction, container: egui::Rect, content_size: egui::Vec2) -> egui::Rect {
    let min = egui::pos2(
        container.left() + container.width() * (instruction.left_percent as f32) / 100.0,
        container.top() + container.height() * (instruction.top_percent as f32) / 100.0,
    );
    let size = match instruction.size {
        DrawSize::Fixed { width, height } => egui::vec2(width as f32, height as f32),
        DrawSize::Auto => {
            let (pad_y, pad_x) = instruction.style.padding;
            content_size + egui::vec2(2.0 * pad_x as f32, 2.0 * pad_y as f32)
        }
    };
    egui::Rect::from_min_size(min, size)
}

/// Topmost instruction under `pointer`. Later entries paint above earlier ones.
fn hit_test<'a>(boxes: &'a [(OverlayId, egui::Rect)], pointer: egui::Pos2) -> Option<&'a (OverlayId, egui::Rect)> {
    boxes.iter().rev().find(|(_, rect)| rect.contains(pointer))
}

fn dashed_border(painter: &egui::Painter, rect: egui::Rect) {
    let corners = [
        rect.left_top(),
        rect.right_top(),
        rect.right_bottom(),
        rect.left_bottom(),
        rect.left_top(),
    ];
    painter.extend(egui::Shape::dashed_line(
        &corners,
        egui::Stroke::new(DRAG_BORDER_WIDTH, DRAG_ACCENT),
        DRAG_DASH,
        DRAG_GAP,
    ));
}

fn paint(painter: &egui::Painter, placed: &Placed<'_>) {
    let style = &placed.instruction.style;
    let radius = egui::CornerRadius::same(style.corner_radius_px.min(u32::from(u8::MAX)) as u8);

    if let Some(background) = style.background {
        painter.rect_filled(placed.rect, radius, color32(background));
    }

    let text_pos = placed.rect.center() - placed.galley.size() / 2.0;
    let color = color32(style.color);
    painter.galley_with_override_text_color(
        text_pos + egui::vec2(SHADOW_OFFSET, SHADOW_OFFSET),
        placed.galley.clone(),
        SHADOW_COLOR,
    );
    painter.galley_with_override_text_color(text_pos, placed.galley.clone(), color);
    if style.font_weight == FontWeight::Bold {
        // No bold face in the default fonts
        painter.galley_with_override_text_color(
            text_pos + egui::vec2(0.6, 0.0),
            placed.galley.clone(),
            color,
        );
    }

    if style.border.is_some() {
        dashed_border(painter, placed.rect);
    }
}

/// Paint the surface. `aspect` is width over height of the video.
pub fn ui(ui: &mut egui::Ui, snapshot: &DashboardSnapshot, aspect: f32) -> Vec<DashboardCommand> {
    let mut commands = Vec::new();

    let width = ui.available_width();
    let height = (width / aspect).min(ui.available_height());
    let (container, response) =
        ui.allocate_exact_size(egui::vec2(height * aspect, height), egui::Sense::drag());
    let painter = ui.painter_at(container);
    painter.rect_filled(container, egui::CornerRadius::ZERO, SURFACE_BACKGROUND);

    if snapshot.stream_id.is_none() {
        painter.text(
            container.center(),
            egui::Align2::CENTER_CENTER,
            "Video plays in the player window once the stream is ready",
            egui::FontId::proportional(14.0),
            SURFACE_PLACEHOLDER,
        );
    }

    let placed: Vec<Placed<'_>> = snapshot
        .draw
        .iter()
        .map(|instruction| {
            let galley = painter.layout_no_wrap(
                label(&instruction.content).to_string(),
                egui::FontId::proportional(instruction.style.font_size_px as f32),
                color32(instruction.style.color),
            );
            let rect = place(instruction, container, galley.size());
            Placed {
                instruction,
                rect,
                galley,
            }
        })
        .collect();

    for item in &placed {
        paint(&painter, item);
    }

    let boxes: Vec<(OverlayId, egui::Rect)> = placed
        .iter()
        .map(|p| (p.instruction.id.clone(), p.rect))
        .collect();

    // egui reports the drag only after the pointer has moved a little
    if response.drag_started()
        && let Some(pointer) = ui
            .input(|i| i.pointer.press_origin())
            .or(response.interact_pointer_pos())
        && let Some((id, rect)) = hit_test(&boxes, pointer)
    {
        commands.push(DashboardCommand::BeginDrag {
            id: id.clone(),
            pointer: to_point(pointer),
            element: to_rect(*rect),
        });
    }

    if response.dragged()
        && snapshot.dragging.is_some()
        && let Some(pointer) = response.interact_pointer_pos()
    {
        commands.push(DashboardCommand::DragTo {
            pointer: to_point(pointer),
            container: to_rect(container),
        });
    }

    if response.drag_stopped() {
        commands.push(DashboardCommand::EndDrag);
    }

    if snapshot.dragging.is_some() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::Grabbing);
    } else if response.hovered()
        && let Some(pointer) = response.hover_pos()
        && hit_test(&boxes, pointer).is_some()
    {
        ui.ctx().set_cursor_icon(egui::CursorIcon::Grab);
    }

    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::render;
    use crate::types::{IconRef, Overlay, OverlayDraft};

    fn instructions() -> Vec<DrawInstruction> {
        render(&[
            Overlay::from_draft(
                OverlayId::new("a"),
                OverlayDraft::text("A", "LIVE").at(10.0, 10.0).with_size(100, 40),
            ),
            Overlay::from_draft(
                OverlayId::new("b"),
                OverlayDraft::icon("B", IconRef::Star).at(12.0, 12.0).with_z_index(5),
            ),
        ])
    }

    #[test]
    fn test_place_fixed_size() {
        let container = egui::Rect::from_min_size(egui::pos2(100.0, 50.0), egui::vec2(1000.0, 500.0));
        let draw = instructions();
        let rect = place(&draw[0], container, egui::vec2(30.0, 12.0));
        assert_eq!(rect.min, egui::pos2(200.0, 100.0));
        assert_eq!(rect.size(), egui::vec2(100.0, 40.0));
    }

    #[test]
    fn test_place_auto_size_adds_padding() {
        let container = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1000.0, 500.0));
        let draw = instructions();
        let rect = place(&draw[1], container, egui::vec2(24.0, 24.0));
        assert_eq!(rect.size(), egui::vec2(32.0, 32.0));
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let boxes = vec![
            (OverlayId::new("a"), egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(100.0, 40.0))),
            (OverlayId::new("b"), egui::Rect::from_min_size(egui::pos2(20.0, 20.0), egui::vec2(30.0, 30.0))),
        ];
        assert_eq!(hit_test(&boxes, egui::pos2(25.0, 25.0)).map(|(id, _)| id.as_str()), Some("b"));
        assert_eq!(hit_test(&boxes, egui::pos2(5.0, 5.0)).map(|(id, _)| id.as_str()), Some("a"));
        assert!(hit_test(&boxes, egui::pos2(500.0, 500.0)).is_none());
    }
}
