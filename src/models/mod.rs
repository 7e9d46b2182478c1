//! Data models for configuration and per-model test state

pub mod config;
pub mod entry;

pub use config::Config;
pub use entry::ModelTestEntry;
