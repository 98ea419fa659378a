//! Telemetry and logging infrastructure
//!
//! Structured logging with tracing and decode timing statistics.

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig, LogGuard};
pub use metrics::{DecodeProfiler, FrameStats};
