//! Stream controls: source URL, start and stop, status and the backend stream list

use eframe::egui;

use crate::dashboard::{DashboardCommand, DashboardSnapshot};
use crate::gui::constants::*;
use crate::stream::StreamPhase;

/// State for the stream controls
#[derive(Debug, Default)]
pub struct StreamPanelState {
    source_url: String,
}

fn phase_color(phase: StreamPhase) -> egui::Color32 {
    match phase {
        StreamPhase::Ready => STATUS_READY,
        StreamPhase::Starting | StreamPhase::WaitingForPlaylist => STATUS_STARTING,
        StreamPhase::Failed => STATUS_STOPPED,
        StreamPhase::Idle | StreamPhase::Stopped => STATUS_IDLE,
    }
}

/// Returns the commands the operator issued this frame
pub fn ui(
    ui: &mut egui::Ui,
    state: &mut StreamPanelState,
    snapshot: &DashboardSnapshot,
) -> Vec<DashboardCommand> {
    let mut commands = Vec::new();

    ui.group(|ui| {
        ui.label(egui::RichText::new("Stream").strong());
        ui.add_space(ITEM_SPACING);

        ui.horizontal(|ui| {
            ui.label("RTSP URL:");
            let input = ui.add(
                egui::TextEdit::singleline(&mut state.source_url)
                    .hint_text("rtsp://camera.local/stream")
                    .desired_width(f32::INFINITY),
            );
            let submitted =
                input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if submitted && snapshot.can_start() {
                commands.push(DashboardCommand::StartStream {
                    source_url: state.source_url.clone(),
                });
            }
        });

        ui.horizontal(|ui| {
            if ui
                .add_enabled(snapshot.can_start(), egui::Button::new("\u{25B6} Start"))
                .clicked()
            {
                commands.push(DashboardCommand::StartStream {
                    source_url: state.source_url.clone(),
                });
            }
            if ui
                .add_enabled(snapshot.phase.is_active(), egui::Button::new("\u{25A0} Stop"))
                .clicked()
            {
                commands.push(DashboardCommand::StopActive);
            }
            if ui.button("\u{1F504} Refresh").clicked() {
                commands.push(DashboardCommand::RefreshStreams);
            }
        });

        ui.add_space(ITEM_SPACING);
        ui.colored_label(
            phase_color(snapshot.phase),
            format!("\u{25CF}  {}", snapshot.phase.label()),
        );
        if let Some(status) = &snapshot.status {
            ui.label(status);
        }
        if let Some(id) = &snapshot.stream_id {
            ui.label(format!("Stream ID: {id}"));
        }
    });

    if let Some(error) = &snapshot.error {
        ui.add_space(ITEM_SPACING);
        ui.horizontal(|ui| {
            ui.colored_label(ERROR_TEXT, error);
            if ui.small_button("\u{2715}").on_hover_text("Dismiss").clicked() {
                commands.push(DashboardCommand::ClearError);
            }
        });
    }

    ui.add_space(SECTION_SPACING);

    ui.group(|ui| {
        ui.label(egui::RichText::new("Active Streams").strong());
        ui.add_space(ITEM_SPACING);

        if snapshot.streams.is_empty() {
            ui.label("No streams on the backend");
        }
        for stream in &snapshot.streams {
            ui.horizontal(|ui| {
                let marker = if stream.playlist_ready {
                    STATUS_READY
                } else if stream.is_running {
                    STATUS_STARTING
                } else {
                    STATUS_IDLE
                };
                ui.colored_label(marker, "\u{25CF}");
                ui.label(&stream.stream_id)
                    .on_hover_text(stream.rtsp_url.as_deref().unwrap_or("unknown source"));
                if ui.small_button("Stop").clicked() {
                    commands.push(DashboardCommand::StopStream {
                        stream_id: stream.stream_id.clone(),
                    });
                }
            });
        }
    });

    commands
}
