// src/lib.rs
//! Synthetic multi-channel ECG generator with streaming beat, ST-segment and
//! rhythm analysis.
//!
//! [`monitor::Monitor`] owns every channel and advances them one display frame
//! per [`monitor::Monitor::tick`]. [`engine::spawn_engine`] runs that loop on a
//! background thread for a front end.

pub mod engine;
pub mod monitor;
pub mod types;

pub use monitor::{Monitor, MonitorCommand, MonitorConfig, MonitorError, MonitorEvent, Severity};
pub use types::{EngineCommand, EngineMessage};
