//! Application-wide constants
//!
//! Bounds, timings, backend routes and operator-facing strings live here so
//! every module agrees on a single value.

/// Overlay field bounds enforced by validation and clamping
pub mod bounds {
    /// Lowest normalized coordinate (percent of container)
    pub const POSITION_MIN: f64 = 0.0;

    /// Highest normalized coordinate. Leaves room for the element's own box
    /// so it never overflows the container at 100%.
    pub const POSITION_MAX: f64 = 95.0;

    /// Text overlay box width in pixels
    pub const TEXT_WIDTH_MIN: u32 = 50;
    pub const TEXT_WIDTH_MAX: u32 = 800;

    /// Text overlay box height in pixels
    pub const TEXT_HEIGHT_MIN: u32 = 20;
    pub const TEXT_HEIGHT_MAX: u32 = 200;

    /// Font size in pixels
    pub const FONT_SIZE_MIN: u32 = 10;
    pub const FONT_SIZE_MAX: u32 = 48;
}

/// Stream readiness polling
pub mod polling {
    /// Delay between a successful start and the first status check
    pub const FIRST_POLL_DELAY_MS: u64 = 3000;

    /// Delay between consecutive status checks
    pub const POLL_INTERVAL_MS: u64 = 2000;

    /// Anything faster than this hammers the backend
    pub const MIN_POLL_INTERVAL_MS: u64 = 100;
}

/// HTTP client settings
pub mod http {
    pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
    pub const MIN_TIMEOUT_MS: u64 = 500;
}

/// Backend REST routes, relative to the API base
pub mod routes {
    pub const STREAMS: &str = "streams";
    pub const STREAM_START: &str = "stream/start";
    pub const OVERLAYS: &str = "overlays";

    pub fn stream_status(stream_id: &str) -> String {
        format!("stream/{stream_id}/status")
    }

    pub fn stream_stop(stream_id: &str) -> String {
        format!("stream/{stream_id}/stop")
    }

    pub fn stream_playlist(stream_id: &str) -> String {
        format!("stream/{stream_id}/playlist.m3u8")
    }

    pub fn overlay(overlay_id: &str) -> String {
        format!("overlays/{overlay_id}")
    }
}

/// Config file location and defaults
pub mod config {
    pub const APP_DIR: &str = "livedeck";
    pub const FILENAME: &str = "config.json";
    pub const DEFAULT_API_BASE: &str = "http://localhost:5000/api";
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

/// Environment variables read at startup
pub mod env {
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const API_BASE: &str = "LIVEDECK_API_BASE";
    pub const MAX_POLL_ATTEMPTS: &str = "LIVEDECK_MAX_POLL_ATTEMPTS";
}

/// External playback process
pub mod player {
    pub const DEFAULT_PROGRAM: &str = "ffplay";
    /// `{title}`, `{width}` and `{height}` are filled in from the video surface
    pub const DEFAULT_ARGS: &[&str] = &[
        "-loglevel",
        "error",
        "-autoexit",
        "-window_title",
        "{title}",
        "-x",
        "{width}",
        "-y",
        "{height}",
    ];

    /// How long a player gets to exit after SIGTERM before it is killed
    pub const TERMINATE_GRACE_MS: u64 = 2000;
}

/// Video surface (16:9 by default)
pub mod surface {
    pub const DEFAULT_WIDTH: u32 = 960;
    pub const DEFAULT_HEIGHT: u32 = 540;
    pub const MIN_WIDTH: u32 = 160;
    pub const MIN_HEIGHT: u32 = 90;
    pub const TITLE: &str = "livedeck";
}

/// Locally generated overlay ids
pub mod ids {
    pub const LOCAL_PREFIX: &str = "local-";
}

/// Status line shown to the operator
pub mod status {
    pub const STARTING: &str = "Starting stream...";
    pub const WAITING_FOR_PLAYLIST: &str = "Stream starting, waiting for playlist...";
    pub const NOT_READY: &str = "Waiting for stream to be ready...";
    pub const READY: &str = "Stream ready!";
    pub const STOPPED: &str = "Stream stopped";
    pub const FAILED: &str = "Stream failed";
    pub const PLAYER_CLOSED: &str = "Player closed, stream still running";
}

/// Error notices shown to the operator
pub mod notices {
    pub const EMPTY_URL: &str = "Please enter an RTSP URL";
    pub const NETWORK_START_ERROR: &str = "Network error starting stream";
    pub const START_FAILED: &str = "Failed to start stream";
    pub const STOP_FAILED: &str = "Failed to stop stream";
    pub const FETCH_STREAMS_FAILED: &str = "Failed to fetch streams";
    pub const PLAYBACK_ERROR: &str = "Video playback error";
}

/// Default look of rendered overlays
pub mod style {
    pub const DEFAULT_COLOR: &str = "#ffffff";
    pub const TEXT_FONT_SIZE_PX: u32 = 16;
    pub const ICON_FONT_SIZE_PX: u32 = 24;

    /// Translucent backing box behind text overlays (black at 30%)
    pub const TEXT_BACKGROUND: &str = "#0000004d";

    /// Padding as (vertical, horizontal) pixels
    pub const TEXT_PADDING: (u32, u32) = (4, 8);
    pub const ICON_PADDING: (u32, u32) = (4, 4);

    pub const CORNER_RADIUS_PX: u32 = 4;
    pub const TEXT_SHADOW: &str = "2px 2px 4px #000000cc";

    /// Dashed border marking the overlay under an active drag
    pub const DRAG_BORDER: &str = "2px dashed #3b82f6";
}

/// Glyphs painted for each icon in the overlay icon set
pub mod glyphs {
    pub const HEART: &str = "\u{2665}";
    pub const STAR: &str = "\u{2605}";
    pub const TROPHY: &str = "\u{1F3C6}";
    pub const CAMERA: &str = "\u{1F4F7}";
    pub const ZAP: &str = "\u{26A1}";
    pub const SHIELD: &str = "\u{1F6E1}";
    pub const MUSIC: &str = "\u{266B}";
    pub const BELL: &str = "\u{1F514}";

    /// Painted for icon references outside the set
    pub const FALLBACK: &str = HEART;
}
