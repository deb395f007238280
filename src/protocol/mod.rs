//! # Secure Message Pipeline
//!
//! Everything between a complete chunk and a decoded application message.
//!
//! ## Components
//! - **Pipeline**: `SecureMessageReader`, one per channel, runs each chunk to completion
//! - **Accumulator**: reassembles multi-chunk messages within size limits
//! - **Sequence**: advisory sequence number continuity check
//! - **Registry**: type id → body decoder mapping
//! - **Notification**: the closed set of events a pipeline emits, and sinks for them
//! - **Reader**: async adapter feeding a pipeline from an `AsyncRead`
//!
//! ## Flow
//! ```text
//! chunk -> parse_header -> security policy -> decrypt/verify -> sequence -> accumulate -> decode -> sink
//! ```

pub mod accumulator;
pub(crate) mod decrypt;
pub mod notification;
pub mod pipeline;
pub mod reader;
pub mod registry;
pub mod sequence;


pub use notification::{
    DecodedMessage, ErrorContext, FnSink, Notification, NotificationSink, NullSink,
};
pub use pipeline::{ChunkOutcome, PipelineStatus, SecureMessageReader};
pub use reader::read_channel;
pub use registry::{DecodedObject, DecoderRegistry};
pub use sequence::SequenceAnomaly;
