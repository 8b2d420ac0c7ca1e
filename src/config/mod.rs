//! Configuration management for livedeck

pub mod dashboard;

pub use dashboard::{DashboardConfig, PlayerConfig, SurfaceConfig};
