pub mod overlay_panel;
pub mod stream_panel;
pub mod surface;
