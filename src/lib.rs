//! # OPC UA Secure Conversation
//!
//! The receive side of an OPC UA secure channel: chunk framing, channel
//! security, token renewal and message reassembly, plus two service-layer
//! utilities (continuation points and numeric ranges).
//!
//! ## Modules
//! - [`core`]: binary primitives, node ids, the chunk frame reader and stream codec
//! - [`security`]: policies, per-channel security context, token store, crypto boundary
//! - [`protocol`]: the secure message pipeline and its notifications
//! - [`services`]: status codes, continuation points, numeric range addressing
//! - [`config`], [`error`], [`utils`]: configuration, errors, logging and metrics
//!
//! ## Example
//! ```rust
//! use opcua_secure_conversation::config::PipelineConfig;
//! use opcua_secure_conversation::core::node_id::NodeId;
//! use opcua_secure_conversation::protocol::{DecoderRegistry, Notification, SecureMessageReader};
//! use opcua_secure_conversation::security::CryptoFactories;
//! use tokio::sync::mpsc;
//!
//! let registry = DecoderRegistry::new();
//! registry.register(NodeId::numeric(0, 631), |r| r.read_u32()).unwrap();
//!
//! let (tx, _rx) = mpsc::unbounded_channel::<Notification>();
//! let reader = SecureMessageReader::new(
//!     &PipelineConfig::default(),
//!     registry,
//!     CryptoFactories::new(),
//!     tx,
//! );
//! # let _ = reader;
//! ```
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod security;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{ProtocolError, Result};
pub use protocol::{ChunkOutcome, Notification, SecureMessageReader};
pub use services::{NumericRange, StatusCode};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
