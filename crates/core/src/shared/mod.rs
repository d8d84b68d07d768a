pub mod bridge_log;
pub mod config;
pub mod constants;
pub mod error;
pub mod pixel_buffer;
