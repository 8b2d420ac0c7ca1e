//! Dashboard context: owns every state machine and runs the event loop
//!
//! All state lives in [`Dashboard`] and changes only inside
//! [`Dashboard::handle_event`] (or the imperative methods it calls). Backend
//! calls run as spawned tasks whose results come back as [`DashboardEvent`]s
//! through the same channel, so one task mutates state at a time. Observers
//! read [`DashboardSnapshot`]s from a watch channel.

pub mod events;
pub mod snapshot;

pub use events::{DashboardCommand, DashboardEvent};
pub use snapshot::DashboardSnapshot;

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::backend::{self, Backend, StreamInfo};
use crate::constants::{notices, status};
use crate::error::{PlaybackError, StoreError, StreamError};
use crate::overlay::{self, DragController, OverlayStore, SyncOp, SyncOutcome};
use crate::scheduler::{Scheduler, TokioScheduler};
use crate::stream::{
    EngineEvent, EngineEvents, PlaybackEngine, PlayerAdapter, PollSettings, StreamCommand,
    StreamController, StreamEvent, StreamPhase, VideoSurface,
};
use crate::types::{Overlay, OverlayDraft, OverlayId, OverlayPatch, Point, Position, Rect};

/// Runtime knobs taken from the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardSettings {
    pub poll: PollSettings,
    pub surface: VideoSurface,
}

pub struct Dashboard<B, E> {
    backend: Arc<B>,
    scheduler: Arc<dyn Scheduler>,
    store: OverlayStore,
    drag: DragController,
    stream: StreamController,
    player: PlayerAdapter<E>,
    streams: Vec<StreamInfo>,
    status: Option<String>,
    error: Option<String>,
    /// Backend stops sent but not yet answered
    stops_in_flight: usize,
    events_tx: mpsc::UnboundedSender<DashboardEvent>,
    events_rx: mpsc::UnboundedReceiver<DashboardEvent>,
    snapshot_tx: watch::Sender<DashboardSnapshot>,
}

impl<B: Backend + 'static, E: PlaybackEngine> Dashboard<B, E> {
    /// `make_engine` receives the sink the engine reports playback events to
    pub fn new(
        backend: Arc<B>,
        settings: DashboardSettings,
        make_engine: impl FnOnce(EngineEvents) -> E,
    ) -> Self {
        Self::with_scheduler(backend, settings, Arc::new(TokioScheduler), make_engine)
    }

    pub fn with_scheduler(
        backend: Arc<B>,
        settings: DashboardSettings,
        scheduler: Arc<dyn Scheduler>,
        make_engine: impl FnOnce(EngineEvents) -> E,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let player_tx = events_tx.clone();
        let engine = make_engine(EngineEvents::new(move |event| {
            let _ = player_tx.send(DashboardEvent::Player(event));
        }));
        let (snapshot_tx, _) = watch::channel(DashboardSnapshot::default());

        Self {
            backend,
            scheduler,
            store: OverlayStore::new(),
            drag: DragController::new(),
            stream: StreamController::new(settings.poll),
            player: PlayerAdapter::new(engine, settings.surface),
            streams: Vec::new(),
            status: None,
            error: None,
            stops_in_flight: 0,
            events_tx,
            events_rx,
            snapshot_tx,
        }
    }

    /// Post events into the loop from other tasks or threads
    pub fn sender(&self) -> mpsc::UnboundedSender<DashboardEvent> {
        self.events_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardSnapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let overlays = self.store.list();
        let draw = overlay::render_frame(&overlays, self.drag.active());
        DashboardSnapshot {
            overlays,
            draw,
            phase: self.stream.phase(),
            stream_id: self.stream.stream_id().map(str::to_string),
            streams: self.streams.clone(),
            status: self.status.clone(),
            error: self.error.clone(),
            dragging: self.drag.active().cloned(),
        }
    }

    pub fn store(&self) -> &OverlayStore {
        &self.store
    }

    pub fn phase(&self) -> StreamPhase {
        self.stream.phase()
    }

    pub fn player(&self) -> &PlayerAdapter<E> {
        &self.player
    }

    // ---- stream lifecycle ----

    pub fn start_stream(&mut self, source_url: &str) -> Result<(), StreamError> {
        self.error = None;
        let result = match self.stream.start(source_url) {
            Ok(commands) => {
                self.execute(commands);
                Ok(())
            }
            Err(err) => {
                self.error = Some(match err {
                    StreamError::EmptySourceUrl => notices::EMPTY_URL.to_string(),
                    ref other => other.to_string(),
                });
                Err(err)
            }
        };
        self.publish();
        result
    }

    pub fn stop_active(&mut self) -> Result<(), StreamError> {
        let commands = self.stream.stop()?;
        self.execute(commands);
        self.publish();
        Ok(())
    }

    pub fn stop_stream(&mut self, stream_id: &str) {
        let commands = self.stream.stop_stream(stream_id);
        self.execute(commands);
        self.publish();
    }

    pub fn refresh_streams(&mut self) {
        self.spawn_backend(|backend| async move {
            DashboardEvent::StreamsListed(backend.list_streams().await)
        });
    }

    // ---- overlays ----

    pub fn load_overlays(&mut self) {
        self.spawn_backend(|backend| async move {
            DashboardEvent::OverlaysLoaded(backend.list_overlays().await)
        });
    }

    pub fn create_overlay(&mut self, draft: OverlayDraft) -> Result<Overlay, StoreError> {
        let (overlay, sync) = self.store.create(draft)?;
        self.after_mutation(sync);
        Ok(overlay)
    }

    pub fn update_overlay(
        &mut self,
        id: &OverlayId,
        patch: OverlayPatch,
    ) -> Result<Overlay, StoreError> {
        let (overlay, sync) = self.store.update(id, patch)?;
        self.after_mutation(sync);
        Ok(overlay)
    }

    pub fn delete_overlay(&mut self, id: &OverlayId) -> Result<(), StoreError> {
        if self.drag.active() == Some(id) {
            self.drag.cancel();
        }
        let sync = self.store.delete(id)?;
        self.after_mutation(sync);
        Ok(())
    }

    pub fn set_visible(&mut self, id: &OverlayId, visible: bool) -> Result<Overlay, StoreError> {
        let (overlay, sync) = self.store.set_visible(id, visible)?;
        self.after_mutation(sync);
        Ok(overlay)
    }

    pub fn set_position(
        &mut self,
        id: &OverlayId,
        position: Position,
    ) -> Result<Overlay, StoreError> {
        let (overlay, sync) = self.store.set_position(id, position)?;
        self.after_mutation(sync);
        Ok(overlay)
    }

    pub fn reorder(&mut self, id: &OverlayId, z_index: i32) -> Result<Overlay, StoreError> {
        let (overlay, sync) = self.store.reorder(id, z_index)?;
        self.after_mutation(sync);
        Ok(overlay)
    }

    // ---- dragging ----

    pub fn begin_drag(&mut self, id: OverlayId, pointer: Point, element: Rect) -> bool {
        let started = self.store.get(&id).is_some() && self.drag.begin(id, pointer, element);
        if started {
            self.publish();
        }
        started
    }

    pub fn drag_to(&mut self, pointer: Point, container: Rect) -> Option<Position> {
        if !self.drag.is_dragging() {
            return None;
        }
        let mut step = self.drag.move_to(pointer, container, &mut self.store);
        if let Some(op) = step.as_mut().and_then(|s| s.send_now.take()) {
            self.dispatch_sync(op);
        }
        self.publish();
        step.map(|s| s.position)
    }

    /// Finish the gesture and send the one update carrying the final position
    pub fn end_drag(&mut self) {
        let sync = self.drag.end();
        self.after_mutation(sync);
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
        self.publish();
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.publish();
    }

    // ---- event loop ----

    /// Wait for the next event and handle it. Returns false once the loop
    /// should stop.
    pub async fn step(&mut self) -> bool {
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    /// Run until [`DashboardEvent::Shutdown`], then stop the active stream
    pub async fn run(mut self) {
        info!("Dashboard loop started");
        while self.step().await {}
        self.shutdown().await;
    }

    /// Run until shutdown or until the stream session ends: it fails, is
    /// stopped, or its player is closed. Returns the final snapshot.
    pub async fn run_session(mut self) -> DashboardSnapshot {
        info!("Dashboard loop started");
        loop {
            let phase = self.stream.phase();
            if !phase.is_active() || (phase == StreamPhase::Ready && !self.player.is_attached()) {
                info!(phase = %phase, "Stream session ended");
                break;
            }
            if !self.step().await {
                break;
            }
        }
        self.shutdown().await;
        self.snapshot()
    }

    /// Stop the active stream on the backend and wait for the answer. A start
    /// still in flight is waited for so its stream can be stopped too.
    pub async fn shutdown(&mut self) {
        self.drag.cancel();
        if let Ok(commands) = self.stream.stop() {
            self.execute_on_exit(commands).await;
        }

        while self.stream.has_orphans() || self.stops_in_flight > 0 {
            let Some(event) = self.events_rx.recv().await else {
                break;
            };
            if let DashboardEvent::Stream(event) = event {
                let commands = self.on_stream_event(event);
                self.execute_on_exit(commands).await;
            }
        }

        self.player.detach();
        self.publish();
        info!("Dashboard loop stopped");
    }

    /// Backend stops are awaited here; the loop that would see their answers is gone
    async fn execute_on_exit(&mut self, commands: Vec<StreamCommand>) {
        for command in commands {
            match command {
                StreamCommand::RequestStop { stream_id } => {
                    info!(stream_id = %stream_id, "Stopping stream before exit");
                    if let Err(err) = self.backend.stop_stream(&stream_id).await {
                        warn!(stream_id = %stream_id, error = %err, "Failed to stop stream on exit");
                    }
                }
                StreamCommand::RefreshStreams => {}
                other => self.execute(vec![other]),
            }
        }
    }

    fn on_stream_event(&mut self, event: StreamEvent) -> Vec<StreamCommand> {
        if let StreamEvent::StopCompleted { .. } = event {
            self.stops_in_flight = self.stops_in_flight.saturating_sub(1);
        }
        self.stream.handle(event)
    }

    pub fn handle_event(&mut self, event: DashboardEvent) -> bool {
        match event {
            DashboardEvent::Command(command) => self.apply_command(command),
            DashboardEvent::Stream(event) => {
                let commands = self.on_stream_event(event);
                self.execute(commands);
            }
            DashboardEvent::Player(event) => self.on_player_event(event),
            DashboardEvent::OverlaySynced { op, result } => {
                match self.store.reconcile(&op, result) {
                    SyncOutcome::Confirmed => {
                        debug!(overlay = %op.id, operation = op.action.label(), "Overlay sync confirmed");
                    }
                    SyncOutcome::Superseded { follow_up } => {
                        if let Some(follow_up) = follow_up {
                            self.dispatch_sync(follow_up);
                        }
                    }
                    // Already logged by the store; the operator is not told
                    SyncOutcome::KeptLocal(_) => {}
                }
            }
            DashboardEvent::OverlaysLoaded(Ok(overlays)) => {
                info!(count = overlays.len(), "Loaded overlays from backend");
                self.store.merge_remote(overlays);
            }
            DashboardEvent::OverlaysLoaded(Err(err)) if self.store.is_empty() => {
                warn!(error = %err, "Failed to load overlays, using demo overlays");
                self.store.seed_local(overlay::demo_overlays());
            }
            DashboardEvent::OverlaysLoaded(Err(err)) => {
                warn!(error = %err, "Failed to load overlays, keeping local overlays");
            }
            DashboardEvent::StreamsListed(Ok(streams)) => {
                debug!(count = streams.len(), "Stream list refreshed");
                self.streams = streams;
            }
            DashboardEvent::StreamsListed(Err(err)) => {
                warn!(error = %err, "Failed to fetch streams");
                self.error = Some(notices::FETCH_STREAMS_FAILED.to_string());
            }
            DashboardEvent::Shutdown => {
                info!("Shutdown requested");
                return false;
            }
        }
        self.publish();
        true
    }

    fn apply_command(&mut self, command: DashboardCommand) {
        debug!(?command, "Handling command");
        let result = match command {
            DashboardCommand::StartStream { source_url } => {
                // Notice already set by start_stream
                let _ = self.start_stream(&source_url);
                Ok(())
            }
            DashboardCommand::StopStream { stream_id } => {
                self.stop_stream(&stream_id);
                Ok(())
            }
            DashboardCommand::StopActive => {
                if let Err(err) = self.stop_active() {
                    debug!(error = %err, "Nothing to stop");
                }
                Ok(())
            }
            DashboardCommand::RefreshStreams => {
                self.refresh_streams();
                Ok(())
            }
            DashboardCommand::LoadOverlays => {
                self.load_overlays();
                Ok(())
            }
            DashboardCommand::CreateOverlay(draft) => self.create_overlay(draft).map(drop),
            DashboardCommand::UpdateOverlay { id, patch } => {
                self.update_overlay(&id, patch).map(drop)
            }
            DashboardCommand::DeleteOverlay(id) => self.delete_overlay(&id),
            DashboardCommand::SetVisible { id, visible } => {
                self.set_visible(&id, visible).map(drop)
            }
            DashboardCommand::SetPosition { id, position } => {
                self.set_position(&id, position).map(drop)
            }
            DashboardCommand::Reorder { id, z_index } => self.reorder(&id, z_index).map(drop),
            DashboardCommand::BeginDrag {
                id,
                pointer,
                element,
            } => {
                self.begin_drag(id, pointer, element);
                Ok(())
            }
            DashboardCommand::DragTo { pointer, container } => {
                self.drag_to(pointer, container);
                Ok(())
            }
            DashboardCommand::EndDrag => {
                self.end_drag();
                Ok(())
            }
            DashboardCommand::CancelDrag => {
                self.cancel_drag();
                Ok(())
            }
            DashboardCommand::ClearError => {
                self.clear_error();
                Ok(())
            }
        };

        if let Err(err) = result {
            warn!(error = %err, "Overlay request rejected");
            self.error = Some(err.to_string());
        }
    }

    fn on_player_event(&mut self, event: EngineEvent) {
        match self.player.handle_engine_event(event) {
            Ok(()) => {}
            Err(PlaybackError::Fatal(details)) => {
                warn!(details = %details, "Fatal playback error, stopping stream");
                let commands = self.stream.handle(StreamEvent::PlaybackFailed {
                    message: notices::PLAYBACK_ERROR.to_string(),
                });
                if commands.is_empty() {
                    self.player.detach();
                    self.error = Some(notices::PLAYBACK_ERROR.to_string());
                } else {
                    self.execute(commands);
                }
            }
            Err(PlaybackError::Ended) => {
                info!("Player closed while the stream is running");
                self.status = Some(status::PLAYER_CLOSED.to_string());
            }
            Err(err) => warn!(error = %err, "Playback error"),
        }
    }

    /// Carry out controller commands. Commands raised while executing (a
    /// player that fails to attach) are queued behind the current batch.
    fn execute(&mut self, commands: Vec<StreamCommand>) {
        let mut queue = VecDeque::from(commands);
        while let Some(command) = queue.pop_front() {
            match command {
                StreamCommand::RequestStart {
                    session,
                    source_url,
                } => self.spawn_backend(move |backend| async move {
                    let event = match backend.start_stream(&source_url).await {
                        Ok(stream_id) => StreamEvent::StartSucceeded { session, stream_id },
                        Err(error) => StreamEvent::StartFailed { session, error },
                    };
                    DashboardEvent::Stream(event)
                }),
                StreamCommand::SchedulePoll { session, delay } => {
                    let tx = self.events_tx.clone();
                    self.scheduler.schedule(
                        delay,
                        Box::new(move || {
                            let _ = tx.send(DashboardEvent::Stream(StreamEvent::PollDue { session }));
                        }),
                    );
                }
                StreamCommand::CheckStatus { session, stream_id } => {
                    self.spawn_backend(move |backend| async move {
                        let event = match backend.stream_status(&stream_id).await {
                            Ok(ready) => StreamEvent::StatusReported { session, ready },
                            Err(error) => StreamEvent::StatusFailed { session, error },
                        };
                        DashboardEvent::Stream(event)
                    })
                }
                StreamCommand::AttachPlayer { stream_id } => {
                    let manifest = self.backend.manifest_url(&stream_id);
                    if let Err(err) = self.player.attach(&manifest) {
                        warn!(stream_id = %stream_id, error = %err, "Failed to attach player");
                        queue.extend(self.stream.handle(StreamEvent::PlaybackFailed {
                            message: format!("{}: {err}", notices::PLAYBACK_ERROR),
                        }));
                    }
                }
                StreamCommand::DetachPlayer => self.player.detach(),
                StreamCommand::RequestStop { stream_id } => {
                    self.stops_in_flight += 1;
                    self.spawn_backend(move |backend| async move {
                        let result = backend.stop_stream(&stream_id).await;
                        DashboardEvent::Stream(StreamEvent::StopCompleted { stream_id, result })
                    })
                }
                StreamCommand::RefreshStreams => self.refresh_streams(),
                StreamCommand::ReportStatus(line) => {
                    info!(status = %line, "Stream status");
                    self.status = Some(line);
                }
                StreamCommand::ReportError(message) => self.error = Some(message),
            }
        }
    }

    fn after_mutation(&mut self, sync: Option<SyncOp>) {
        if let Some(op) = sync {
            self.dispatch_sync(op);
        }
        self.publish();
    }

    fn dispatch_sync(&self, op: SyncOp) {
        debug!(overlay = %op.id, revision = op.revision, operation = op.action.label(), "Sending overlay sync");
        self.spawn_backend(move |remote| async move {
            let result = backend::send_sync(remote.as_ref(), &op).await;
            DashboardEvent::OverlaySynced { op, result }
        });
    }

    fn spawn_backend<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<B>) -> Fut,
        Fut: Future<Output = DashboardEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        let task = call(Arc::clone(&self.backend));
        tokio::spawn(async move {
            let _ = tx.send(task.await);
        });
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }
}
