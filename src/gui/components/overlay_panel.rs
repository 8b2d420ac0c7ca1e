//! Overlay editor: add text and icon overlays, toggle, restack and delete them

use eframe::egui;

use crate::constants::{bounds, style};
use crate::dashboard::{DashboardCommand, DashboardSnapshot};
use crate::gui::constants::*;
use crate::types::{FontWeight, IconRef, OverlayDraft, OverlayKind, OverlayStyle};

/// State for the overlay list and the quick-add form
#[derive(Debug)]
pub struct OverlayPanelState {
    text: String,
    icon: IconRef,
    color: String,
    font_size: u32,
    bold: bool,
    form_error: Option<String>,
}

impl Default for OverlayPanelState {
    fn default() -> Self {
        Self {
            text: "LIVE".to_string(),
            icon: IconRef::Heart,
            color: style::DEFAULT_COLOR.to_string(),
            font_size: style::TEXT_FONT_SIZE_PX,
            bold: false,
            form_error: None,
        }
    }
}

impl OverlayPanelState {
    fn style(&self) -> Result<OverlayStyle, String> {
        let style = OverlayStyle::default()
            .with_color(&self.color)
            .map_err(|e| e.to_string())?
            .with_font_size(self.font_size);
        Ok(if self.bold {
            style.with_font_weight(FontWeight::Bold)
        } else {
            style
        })
    }
}

pub fn ui(
    ui: &mut egui::Ui,
    state: &mut OverlayPanelState,
    snapshot: &DashboardSnapshot,
) -> Vec<DashboardCommand> {
    let mut commands = Vec::new();

    ui.group(|ui| {
        ui.label(egui::RichText::new("Add Overlay").strong());
        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("Text:");
            ui.text_edit_singleline(&mut state.text);
        });
        ui.horizontal(|ui| {
            ui.label("Color:");
            ui.add(egui::TextEdit::singleline(&mut state.color).desired_width(90.0));
            ui.label("Size:");
            ui.add(
                egui::DragValue::new(&mut state.font_size)
                    .range(bounds::FONT_SIZE_MIN..=bounds::FONT_SIZE_MAX)
                    .suffix("px"),
            );
            ui.checkbox(&mut state.bold, "Bold");
        });

        ui.horizontal(|ui| {
            if ui.button("Add Text").clicked() {
                match state.style() {
                    Ok(style) => {
                        state.form_error = None;
                        let name = format!("Text: {}", state.text.trim());
                        commands.push(DashboardCommand::CreateOverlay(
                            OverlayDraft::text(name, state.text.trim()).with_style(style),
                        ));
                    }
                    Err(err) => state.form_error = Some(err),
                }
            }

            egui::ComboBox::from_id_salt("overlay_icon")
                .selected_text(state.icon.name())
                .show_ui(ui, |ui| {
                    for icon in IconRef::ALL {
                        let name = icon.name().to_string();
                        ui.selectable_value(&mut state.icon, icon.clone(), name);
                    }
                });

            if ui.button("Add Icon").clicked() {
                match state.style() {
                    Ok(style) => {
                        state.form_error = None;
                        commands.push(DashboardCommand::CreateOverlay(
                            OverlayDraft::icon(state.icon.name().to_string(), state.icon.clone())
                                .with_style(style),
                        ));
                    }
                    Err(err) => state.form_error = Some(err),
                }
            }
        });

        if let Some(err) = &state.form_error {
            ui.colored_label(ERROR_TEXT, err);
        }
    });

    ui.add_space(SECTION_SPACING);

    ui.group(|ui| {
        ui.label(egui::RichText::new("Overlays").strong());
        ui.add_space(ITEM_SPACING);

        if snapshot.overlays.is_empty() {
            ui.label("No overlays yet");
        }

        egui::ScrollArea::vertical()
            .id_salt("overlay_list")
            .show(ui, |ui| {
                for overlay in &snapshot.overlays {
                    ui.horizontal(|ui| {
                        let mut visible = overlay.visible;
                        if ui.checkbox(&mut visible, "").changed() {
                            commands.push(DashboardCommand::SetVisible {
                                id: overlay.id.clone(),
                                visible,
                            });
                        }

                        let summary = match &overlay.kind {
                            OverlayKind::Text { content } => format!("{} \"{content}\"", overlay.name),
                            OverlayKind::Icon { icon } => format!("{} [{icon}]", overlay.name),
                        };
                        ui.label(summary).on_hover_text(format!(
                            "{:.1}%, {:.1}%",
                            overlay.position.x, overlay.position.y
                        ));

                        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                            if ui.small_button("\u{1F5D1}").on_hover_text("Delete").clicked() {
                                commands.push(DashboardCommand::DeleteOverlay(overlay.id.clone()));
                            }
                            let mut z_index = overlay.z_index;
                            if ui
                                .add(egui::DragValue::new(&mut z_index).prefix("z "))
                                .changed()
                            {
                                commands.push(DashboardCommand::Reorder {
                                    id: overlay.id.clone(),
                                    z_index,
                                });
                            }
                        });
                    });
                }
            });
    });

    commands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_style_validates_color() {
        let mut state = OverlayPanelState::default();
        assert!(state.style().is_ok());

        state.color = "red-ish".to_string();
        assert!(state.style().unwrap_err().contains("style.color"));
    }

    #[test]
    fn test_form_style_bold() {
        let state = OverlayPanelState {
            bold: true,
            ..Default::default()
        };
        assert_eq!(state.style().unwrap().font_weight, Some(FontWeight::Bold));
    }
}
