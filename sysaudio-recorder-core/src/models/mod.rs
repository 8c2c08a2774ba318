pub mod config;
pub mod error;
pub mod event;
pub mod format;
pub mod release;
pub mod state;
