//! Operator window implemented with egui/eframe
//!
//! The dashboard runs its own event loop on a background thread. The window
//! only reads snapshots and posts commands.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use eframe::{CreationContext, NativeOptions, egui};
use tokio::sync::{mpsc, watch};
use tracing::{error, info};

use super::components::{overlay_panel, stream_panel, surface};
use super::constants::*;
use crate::backend::HttpBackend;
use crate::config::DashboardConfig;
use crate::dashboard::{Dashboard, DashboardCommand, DashboardEvent, DashboardSnapshot};
use crate::stream::ExternalPlayer;

struct DashboardApp {
    commands: mpsc::UnboundedSender<DashboardEvent>,
    snapshots: watch::Receiver<DashboardSnapshot>,
    snapshot: DashboardSnapshot,
    aspect: f32,
    stream_panel: stream_panel::StreamPanelState,
    overlay_panel: overlay_panel::OverlayPanelState,
    worker: Option<JoinHandle<()>>,
}

impl DashboardApp {
    fn new(
        _cc: &CreationContext<'_>,
        commands: mpsc::UnboundedSender<DashboardEvent>,
        snapshots: watch::Receiver<DashboardSnapshot>,
        aspect: f32,
        worker: JoinHandle<()>,
    ) -> Self {
        info!("Initializing dashboard window");
        Self {
            commands,
            snapshots,
            snapshot: DashboardSnapshot::default(),
            aspect,
            stream_panel: stream_panel::StreamPanelState::default(),
            overlay_panel: overlay_panel::OverlayPanelState::default(),
            worker: Some(worker),
        }
    }

    fn send_all(&self, commands: Vec<DashboardCommand>) {
        for command in commands {
            if self.commands.send(command.into()).is_err() {
                error!("Dashboard loop is gone, dropping command");
                return;
            }
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.snapshots.has_changed().unwrap_or(false) {
            self.snapshot = self.snapshots.borrow_and_update().clone();
        }

        let mut commands = Vec::new();

        egui::SidePanel::left("controls")
            .exact_width(SIDE_PANEL_WIDTH)
            .show(ctx, |ui| {
                ui.add_space(PADDING);
                ui.heading("livedeck");
                ui.add_space(SECTION_SPACING);
                egui::ScrollArea::vertical().show(ui, |ui| {
                    commands.extend(stream_panel::ui(ui, &mut self.stream_panel, &self.snapshot));
                    ui.add_space(SECTION_SPACING);
                    commands.extend(overlay_panel::ui(
                        ui,
                        &mut self.overlay_panel,
                        &self.snapshot,
                    ));
                });
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(PADDING);
            commands.extend(surface::ui(ui, &self.snapshot, self.aspect));
            ui.add_space(ITEM_SPACING);
            ui.label("Drag overlays to reposition them. Positions sync when you let go.");
        });

        self.send_all(commands);
        ctx.request_repaint_after(Duration::from_millis(REFRESH_INTERVAL_MS));
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let _ = self.commands.send(DashboardEvent::Shutdown);
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("Dashboard thread panicked during shutdown");
        }
        info!("Dashboard window exiting");
    }
}

/// Start the dashboard loop on its own thread and open the window
pub fn run_gui(config: &DashboardConfig) -> Result<()> {
    let backend = HttpBackend::new(&config.api_base, config.request_timeout())
        .context(format!("Invalid API base {}", config.api_base))?;
    let player_config = config.player.clone();
    let dashboard = Dashboard::new(Arc::new(backend), config.dashboard_settings(), |events| {
        ExternalPlayer::new(&player_config, events)
    });
    let commands = dashboard.sender();
    let snapshots = dashboard.subscribe();

    let _ = commands.send(DashboardCommand::LoadOverlays.into());
    let _ = commands.send(DashboardCommand::RefreshStreams.into());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build async runtime")?;
    let worker = std::thread::Builder::new()
        .name("dashboard".to_string())
        .spawn(move || runtime.block_on(dashboard.run()))
        .context("Failed to spawn dashboard thread")?;

    let aspect = config.surface.width as f32 / config.surface.height as f32;
    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_min_inner_size([WINDOW_MIN_WIDTH, WINDOW_MIN_HEIGHT])
            .with_title("livedeck"),
        ..Default::default()
    };

    eframe::run_native(
        "livedeck",
        options,
        Box::new(move |cc| {
            Ok(Box::new(DashboardApp::new(
                cc, commands, snapshots, aspect, worker,
            )))
        }),
    )
    .map_err(|err| anyhow!("Failed to launch dashboard window: {err}"))
}
