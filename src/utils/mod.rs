//! # Utility Modules
//!
//! Supporting utilities for logging, metrics and diagnostics.
//!
//! ## Components
//! - **Logging**: Structured logging configuration (tracing-subscriber)
//! - **Metrics**: Thread-safe observability counters
//! - **Hexdump**: Offending-bytes dumps for rejected chunks

pub mod hexdump;
pub mod logging;
pub mod metrics;
