//! livedeck - operator dashboard for remote RTSP-to-HLS streams with
//! draggable text and icon overlays

#![forbid(unsafe_code)]

pub mod backend;
pub mod color;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod gui;
pub mod overlay;
pub mod scheduler;
pub mod signals;
pub mod stream;
pub mod types;
