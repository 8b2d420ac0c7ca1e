//! Stream Lifecycle Controller
//!
//! A pure transition function: operator requests and backend results go in,
//! [`StreamCommand`]s come out for the dashboard to execute. Every async result
//! carries the [`SessionId`] it was issued for, so answers belonging to a
//! stopped or replaced session fall through without touching state.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{notices, polling, status};
use crate::error::{RemoteError, StreamError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum StreamPhase {
    #[default]
    Idle,
    Starting,
    WaitingForPlaylist,
    Ready,
    Stopped,
    Failed,
}

impl StreamPhase {
    /// Whether a new start request is accepted in this phase
    pub fn can_start(&self) -> bool {
        matches!(self, StreamPhase::Idle | StreamPhase::Stopped | StreamPhase::Failed)
    }

    pub fn is_active(&self) -> bool {
        !self.can_start()
    }

    pub fn label(&self) -> &'static str {
        match self {
            StreamPhase::Idle => "idle",
            StreamPhase::Starting => "starting",
            StreamPhase::WaitingForPlaylist => "waiting for playlist",
            StreamPhase::Ready => "ready",
            StreamPhase::Stopped => "stopped",
            StreamPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for StreamPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Generation token for one start attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub first_delay: Duration,
    pub interval: Duration,
    /// `None` polls until ready or stopped
    pub max_attempts: Option<u32>,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_millis(polling::FIRST_POLL_DELAY_MS),
            interval: Duration::from_millis(polling::POLL_INTERVAL_MS),
            max_attempts: None,
        }
    }
}

/// Side effects requested by the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCommand {
    RequestStart { session: SessionId, source_url: String },
    SchedulePoll { session: SessionId, delay: Duration },
    CheckStatus { session: SessionId, stream_id: String },
    AttachPlayer { stream_id: String },
    DetachPlayer,
    RequestStop { stream_id: String },
    RefreshStreams,
    ReportStatus(String),
    ReportError(String),
}

/// Results fed back into the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    StartSucceeded { session: SessionId, stream_id: String },
    StartFailed { session: SessionId, error: RemoteError },
    PollDue { session: SessionId },
    StatusReported { session: SessionId, ready: bool },
    StatusFailed { session: SessionId, error: RemoteError },
    StopCompleted { stream_id: String, result: Result<(), RemoteError> },
    PlaybackFailed { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollStage {
    Scheduled,
    InFlight,
}

#[derive(Debug)]
struct Session {
    id: SessionId,
    stream_id: Option<String>,
    polls: u32,
    poll: Option<PollStage>,
}

#[derive(Debug, Default)]
pub struct StreamController {
    settings: PollSettings,
    phase: StreamPhase,
    session: Option<Session>,
    next_session: u64,
    /// Sessions stopped before the backend answered their start
    orphans: HashSet<SessionId>,
}

impl StreamController {
    pub fn new(settings: PollSettings) -> Self {
        Self {
            settings,
            ..Default::default()
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    /// Backend id of the active session, once known
    pub fn stream_id(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.stream_id.as_deref())
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    /// Whether a stopped session's start is still waiting for the backend
    pub fn has_orphans(&self) -> bool {
        !self.orphans.is_empty()
    }

    /// Operator start request
    pub fn start(&mut self, source_url: &str) -> Result<Vec<StreamCommand>, StreamError> {
        let source_url = source_url.trim();
        if source_url.is_empty() {
            return Err(StreamError::EmptySourceUrl);
        }
        if !self.phase.can_start() {
            return Err(StreamError::SessionActive(self.phase));
        }

        self.next_session += 1;
        let session = SessionId(self.next_session);
        self.session = Some(Session {
            id: session,
            stream_id: None,
            polls: 0,
            poll: None,
        });
        self.phase = StreamPhase::Starting;

        info!(session = %session, source_url = %source_url, "Starting stream");
        Ok(vec![
            StreamCommand::ReportStatus(status::STARTING.to_string()),
            StreamCommand::RequestStart {
                session,
                source_url: source_url.to_string(),
            },
        ])
    }

    /// Operator stop of the active session
    pub fn stop(&mut self) -> Result<Vec<StreamCommand>, StreamError> {
        if !self.phase.is_active() {
            return Err(StreamError::NoActiveSession);
        }
        let session = self.session.take().ok_or(StreamError::NoActiveSession)?;
        self.phase = StreamPhase::Stopped;

        let mut commands = Vec::new();
        match session.stream_id {
            Some(stream_id) => {
                info!(session = %session.id, stream_id = %stream_id, "Stopping stream");
                commands.push(StreamCommand::RequestStop { stream_id });
            }
            None => {
                // Start still in flight; its stream gets stopped when the answer lands
                info!(session = %session.id, "Stopping stream before start completed");
                self.orphans.insert(session.id);
            }
        }
        commands.push(StreamCommand::DetachPlayer);
        commands.push(StreamCommand::ReportStatus(status::STOPPED.to_string()));
        Ok(commands)
    }

    /// Stop a stream by backend id. Only the active session gets the full
    /// teardown; any other id is just stopped on the backend.
    pub fn stop_stream(&mut self, stream_id: &str) -> Vec<StreamCommand> {
        if self.stream_id() == Some(stream_id) {
            return self.stop().unwrap_or_default();
        }
        info!(stream_id = %stream_id, "Stopping inactive backend stream");
        vec![StreamCommand::RequestStop {
            stream_id: stream_id.to_string(),
        }]
    }

    pub fn handle(&mut self, event: StreamEvent) -> Vec<StreamCommand> {
        match event {
            StreamEvent::StartSucceeded { session, stream_id } => {
                self.on_start_succeeded(session, stream_id)
            }
            StreamEvent::StartFailed { session, error } => self.on_start_failed(session, error),
            StreamEvent::PollDue { session } => self.on_poll_due(session),
            StreamEvent::StatusReported { session, ready } => self.on_status(session, ready),
            StreamEvent::StatusFailed { session, error } => {
                debug!(session = %session, error = %error, "Status check failed, treating as not ready");
                self.on_status(session, false)
            }
            StreamEvent::StopCompleted { stream_id, result } => match result {
                Ok(()) => {
                    info!(stream_id = %stream_id, "Backend stream stopped");
                    vec![StreamCommand::RefreshStreams]
                }
                Err(error) => {
                    warn!(stream_id = %stream_id, error = %error, "Backend stop failed");
                    vec![
                        StreamCommand::ReportError(format!("{}: {error}", notices::STOP_FAILED)),
                        StreamCommand::RefreshStreams,
                    ]
                }
            },
            StreamEvent::PlaybackFailed { message } => self.on_playback_failed(message),
        }
    }

    fn on_start_succeeded(&mut self, session: SessionId, stream_id: String) -> Vec<StreamCommand> {
        if self.orphans.remove(&session) {
            info!(session = %session, stream_id = %stream_id, "Cleaning up stream started after stop");
            return vec![StreamCommand::RequestStop { stream_id }];
        }
        let Some(current) = self.current_mut(session, StreamPhase::Starting) else {
            debug!(session = %session, "Ignoring start result for stale session");
            return Vec::new();
        };

        current.stream_id = Some(stream_id.clone());
        current.poll = Some(PollStage::Scheduled);
        self.phase = StreamPhase::WaitingForPlaylist;

        info!(session = %session, stream_id = %stream_id, "Stream started, waiting for playlist");
        vec![
            StreamCommand::ReportStatus(status::WAITING_FOR_PLAYLIST.to_string()),
            StreamCommand::RefreshStreams,
            StreamCommand::SchedulePoll {
                session,
                delay: self.settings.first_delay,
            },
        ]
    }

    fn on_start_failed(&mut self, session: SessionId, error: RemoteError) -> Vec<StreamCommand> {
        if self.orphans.remove(&session) {
            return Vec::new();
        }
        if self.current_mut(session, StreamPhase::Starting).is_none() {
            return Vec::new();
        }

        self.session = None;
        self.phase = StreamPhase::Failed;

        let message = match &error {
            RemoteError::Rejected { message, .. } => message.clone(),
            RemoteError::Unavailable(_) => notices::NETWORK_START_ERROR.to_string(),
            RemoteError::InvalidEndpoint(_) => format!("{}: {error}", notices::START_FAILED),
        };
        warn!(session = %session, error = %error, "Stream start failed");
        vec![
            StreamCommand::ReportStatus(status::FAILED.to_string()),
            StreamCommand::ReportError(message),
        ]
    }

    fn on_poll_due(&mut self, session: SessionId) -> Vec<StreamCommand> {
        let Some(current) = self.current_mut(session, StreamPhase::WaitingForPlaylist) else {
            return Vec::new();
        };
        if current.poll != Some(PollStage::Scheduled) {
            return Vec::new();
        }
        let Some(stream_id) = current.stream_id.clone() else {
            return Vec::new();
        };

        current.poll = Some(PollStage::InFlight);
        current.polls += 1;
        debug!(session = %session, stream_id = %stream_id, attempt = current.polls, "Checking stream status");
        vec![StreamCommand::CheckStatus { session, stream_id }]
    }

    fn on_status(&mut self, session: SessionId, ready: bool) -> Vec<StreamCommand> {
        let max_attempts = self.settings.max_attempts;
        let interval = self.settings.interval;
        let Some(current) = self.current_mut(session, StreamPhase::WaitingForPlaylist) else {
            debug!(session = %session, "Ignoring status for inactive session");
            return Vec::new();
        };
        if current.poll != Some(PollStage::InFlight) {
            return Vec::new();
        }
        let Some(stream_id) = current.stream_id.clone() else {
            return Vec::new();
        };

        if ready {
            current.poll = None;
            self.phase = StreamPhase::Ready;
            info!(session = %session, stream_id = %stream_id, "Stream ready");
            return vec![
                StreamCommand::ReportStatus(status::READY.to_string()),
                StreamCommand::AttachPlayer { stream_id },
            ];
        }

        if let Some(limit) = max_attempts
            && current.polls >= limit
        {
            self.session = None;
            self.phase = StreamPhase::Failed;
            warn!(session = %session, stream_id = %stream_id, attempts = limit, "Playlist never became ready");
            return vec![
                StreamCommand::RequestStop { stream_id },
                StreamCommand::ReportStatus(status::FAILED.to_string()),
                StreamCommand::ReportError(format!(
                    "Playlist not ready after {limit} status checks"
                )),
            ];
        }

        current.poll = Some(PollStage::Scheduled);
        vec![
            StreamCommand::ReportStatus(status::NOT_READY.to_string()),
            StreamCommand::SchedulePoll {
                session,
                delay: interval,
            },
        ]
    }

    /// A fatal playback error ends the session as if the operator had stopped it
    fn on_playback_failed(&mut self, message: String) -> Vec<StreamCommand> {
        if !self.phase.is_active() {
            return Vec::new();
        }
        let mut commands = Vec::new();
        if let Some(session) = self.session.take() {
            if let Some(stream_id) = session.stream_id {
                commands.push(StreamCommand::RequestStop { stream_id });
            } else {
                self.orphans.insert(session.id);
            }
        }
        self.phase = StreamPhase::Failed;

        warn!(message = %message, "Fatal playback error, stopping stream");
        commands.push(StreamCommand::DetachPlayer);
        commands.push(StreamCommand::ReportStatus(status::FAILED.to_string()));
        commands.push(StreamCommand::ReportError(message));
        commands
    }

    fn current_mut(&mut self, session: SessionId, phase: StreamPhase) -> Option<&mut Session> {
        if self.phase != phase {
            return None;
        }
        self.session.as_mut().filter(|s| s.id == session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poll_count(commands: &[StreamCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, StreamCommand::SchedulePoll { .. }))
            .count()
    }

    fn started(controller: &mut StreamController, stream_id: &str) -> SessionId {
        controller.start("rtsp://cam").unwrap();
        let session = controller.session().unwrap();
        controller.handle(StreamEvent::StartSucceeded {
            session,
            stream_id: stream_id.to_string(),
        });
        session
    }

    #[test]
    fn test_start_poll_ready_scenario() {
        let mut controller = StreamController::new(PollSettings::default());

        let commands = controller.start("rtsp://cam").unwrap();
        assert_eq!(controller.phase(), StreamPhase::Starting);
        let session = controller.session().unwrap();
        assert!(commands.contains(&StreamCommand::RequestStart {
            session,
            source_url: "rtsp://cam".to_string()
        }));

        let commands = controller.handle(StreamEvent::StartSucceeded {
            session,
            stream_id: "abc".to_string(),
        });
        assert_eq!(controller.phase(), StreamPhase::WaitingForPlaylist);
        assert_eq!(controller.stream_id(), Some("abc"));
        assert!(commands.contains(&StreamCommand::SchedulePoll {
            session,
            delay: Duration::from_millis(3000)
        }));

        let commands = controller.handle(StreamEvent::PollDue { session });
        assert_eq!(
            commands,
            vec![StreamCommand::CheckStatus {
                session,
                stream_id: "abc".to_string()
            }]
        );

        let commands = controller.handle(StreamEvent::StatusReported { session, ready: false });
        assert_eq!(controller.phase(), StreamPhase::WaitingForPlaylist);
        assert_eq!(poll_count(&commands), 1);
        assert!(commands.contains(&StreamCommand::SchedulePoll {
            session,
            delay: Duration::from_millis(2000)
        }));

        controller.handle(StreamEvent::PollDue { session });
        let commands = controller.handle(StreamEvent::StatusReported { session, ready: true });
        assert_eq!(controller.phase(), StreamPhase::Ready);
        let attaches: Vec<_> = commands
            .iter()
            .filter(|c| matches!(c, StreamCommand::AttachPlayer { .. }))
            .collect();
        assert_eq!(
            attaches,
            vec![&StreamCommand::AttachPlayer {
                stream_id: "abc".to_string()
            }]
        );
    }

    #[test]
    fn test_status_after_stop_is_ignored() {
        let mut controller = StreamController::new(PollSettings::default());
        let session = started(&mut controller, "abc");
        controller.handle(StreamEvent::PollDue { session });

        let commands = controller.stop_stream("abc");
        assert_eq!(controller.phase(), StreamPhase::Stopped);
        assert!(commands.contains(&StreamCommand::RequestStop {
            stream_id: "abc".to_string()
        }));
        assert!(commands.contains(&StreamCommand::DetachPlayer));

        for ready in [false, true] {
            let commands = controller.handle(StreamEvent::StatusReported { session, ready });
            assert!(commands.is_empty());
            assert_eq!(controller.phase(), StreamPhase::Stopped);
        }
        assert!(controller.handle(StreamEvent::PollDue { session }).is_empty());
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let mut controller = StreamController::default();
        assert_eq!(controller.start("   ").unwrap_err(), StreamError::EmptySourceUrl);
        assert_eq!(controller.phase(), StreamPhase::Idle);
    }

    #[test]
    fn test_second_start_while_active_is_rejected() {
        let mut controller = StreamController::default();
        started(&mut controller, "abc");
        assert_eq!(
            controller.start("rtsp://other").unwrap_err(),
            StreamError::SessionActive(StreamPhase::WaitingForPlaylist)
        );
        assert_eq!(controller.stream_id(), Some("abc"));
    }

    #[test]
    fn test_backend_rejection_surfaces_message_verbatim() {
        let mut controller = StreamController::default();
        controller.start("rtsp://cam").unwrap();
        let session = controller.session().unwrap();

        let commands = controller.handle(StreamEvent::StartFailed {
            session,
            error: RemoteError::Rejected {
                status: 400,
                message: "Invalid RTSP URL format".to_string(),
            },
        });
        assert_eq!(controller.phase(), StreamPhase::Failed);
        assert!(commands.contains(&StreamCommand::ReportError("Invalid RTSP URL format".to_string())));

        // A fresh start is allowed after failure
        assert!(controller.start("rtsp://cam").is_ok());
    }

    #[test]
    fn test_network_failure_on_start() {
        let mut controller = StreamController::default();
        controller.start("rtsp://cam").unwrap();
        let session = controller.session().unwrap();
        let commands = controller.handle(StreamEvent::StartFailed {
            session,
            error: RemoteError::Unavailable("connection refused".to_string()),
        });
        assert!(commands.contains(&StreamCommand::ReportError(
            notices::NETWORK_START_ERROR.to_string()
        )));
    }

    #[test]
    fn test_poll_failures_are_retried() {
        let mut controller = StreamController::default();
        let session = started(&mut controller, "abc");

        for _ in 0..5 {
            controller.handle(StreamEvent::PollDue { session });
            let commands = controller.handle(StreamEvent::StatusFailed {
                session,
                error: RemoteError::Unavailable("timeout".to_string()),
            });
            assert_eq!(poll_count(&commands), 1);
            assert!(!commands.iter().any(|c| matches!(c, StreamCommand::ReportError(_))));
        }
        assert_eq!(controller.phase(), StreamPhase::WaitingForPlaylist);
    }

    #[test]
    fn test_duplicate_poll_tick_does_not_double_poll() {
        let mut controller = StreamController::default();
        let session = started(&mut controller, "abc");
        assert_eq!(controller.handle(StreamEvent::PollDue { session }).len(), 1);
        assert!(controller.handle(StreamEvent::PollDue { session }).is_empty());
    }

    #[test]
    fn test_poll_bound_fails_session() {
        let mut controller = StreamController::new(PollSettings {
            max_attempts: Some(2),
            ..PollSettings::default()
        });
        let session = started(&mut controller, "abc");

        controller.handle(StreamEvent::PollDue { session });
        controller.handle(StreamEvent::StatusReported { session, ready: false });
        controller.handle(StreamEvent::PollDue { session });
        let commands = controller.handle(StreamEvent::StatusReported { session, ready: false });

        assert_eq!(controller.phase(), StreamPhase::Failed);
        assert_eq!(poll_count(&commands), 0);
        assert!(commands.contains(&StreamCommand::RequestStop {
            stream_id: "abc".to_string()
        }));
        assert!(commands.contains(&StreamCommand::ReportError(
            "Playlist not ready after 2 status checks".to_string()
        )));
    }

    #[test]
    fn test_stop_while_starting_cleans_up_orphan() {
        let mut controller = StreamController::default();
        controller.start("rtsp://cam").unwrap();
        let session = controller.session().unwrap();

        let commands = controller.stop().unwrap();
        assert_eq!(controller.phase(), StreamPhase::Stopped);
        assert!(!commands.iter().any(|c| matches!(c, StreamCommand::RequestStop { .. })));
        assert!(controller.has_orphans());

        let commands = controller.handle(StreamEvent::StartSucceeded {
            session,
            stream_id: "late".to_string(),
        });
        assert_eq!(
            commands,
            vec![StreamCommand::RequestStop {
                stream_id: "late".to_string()
            }]
        );
        assert_eq!(controller.phase(), StreamPhase::Stopped);
        assert!(!controller.has_orphans());
    }

    #[test]
    fn test_old_session_result_does_not_leak_into_new_one() {
        let mut controller = StreamController::default();
        let old = started(&mut controller, "abc");
        controller.stop().unwrap();
        let new = started(&mut controller, "def");
        assert_ne!(old, new);

        controller.handle(StreamEvent::PollDue { session: new });
        assert!(controller.handle(StreamEvent::StatusReported { session: old, ready: true }).is_empty());
        assert_eq!(controller.phase(), StreamPhase::WaitingForPlaylist);
        assert_eq!(controller.stream_id(), Some("def"));
    }

    #[test]
    fn test_stop_without_session_is_rejected() {
        let mut controller = StreamController::default();
        assert_eq!(controller.stop().unwrap_err(), StreamError::NoActiveSession);
    }

    #[test]
    fn test_stopping_other_stream_keeps_active_session() {
        let mut controller = StreamController::default();
        started(&mut controller, "abc");
        let commands = controller.stop_stream("zzz");
        assert_eq!(
            commands,
            vec![StreamCommand::RequestStop {
                stream_id: "zzz".to_string()
            }]
        );
        assert_eq!(controller.phase(), StreamPhase::WaitingForPlaylist);
    }

    #[test]
    fn test_fatal_playback_forces_stop() {
        let mut controller = StreamController::default();
        let session = started(&mut controller, "abc");
        controller.handle(StreamEvent::PollDue { session });
        controller.handle(StreamEvent::StatusReported { session, ready: true });

        let commands = controller.handle(StreamEvent::PlaybackFailed {
            message: notices::PLAYBACK_ERROR.to_string(),
        });
        assert_eq!(controller.phase(), StreamPhase::Failed);
        assert!(commands.contains(&StreamCommand::RequestStop {
            stream_id: "abc".to_string()
        }));
        assert!(commands.contains(&StreamCommand::DetachPlayer));
        assert!(commands.contains(&StreamCommand::ReportError(notices::PLAYBACK_ERROR.to_string())));
        assert!(controller.start("rtsp://cam").is_ok());
    }

    #[test]
    fn test_stop_failure_is_surfaced() {
        let mut controller = StreamController::default();
        let commands = controller.handle(StreamEvent::StopCompleted {
            stream_id: "abc".to_string(),
            result: Err(RemoteError::Rejected {
                status: 404,
                message: "Stream not found".to_string(),
            }),
        });
        assert!(commands.contains(&StreamCommand::ReportError(
            "Failed to stop stream: Stream not found".to_string()
        )));
    }
}
