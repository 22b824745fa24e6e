//! Utilities

pub mod logger;

pub use logger::{init_logging, subscribe_logs, LogEvent};
