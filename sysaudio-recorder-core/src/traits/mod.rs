pub mod capture_source;
pub mod host_channel;
pub mod overlay_surface;
