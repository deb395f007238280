//! # Core Framing Components
//!
//! Low-level chunk handling: the binary primitive reader, node identifiers,
//! the chunk frame reader and the stream codec.
//!
//! ## Components
//! - **Binary**: bounds-checked little-endian reader/writer
//! - **NodeId**: type identifiers carried at the front of every message body
//! - **Header**: common header + security header parsing (`parse_header`)
//! - **Codec**: Tokio codec splitting a byte stream into whole chunks
//!
//! ## Wire Format
//! ```text
//! [Type(3)] [Role(1)] [Size(4)] [ChannelId(4)] [SecurityHeader] [SequenceHeader(8)] [Body]
//! ```
//!
//! ## Security
//! - Chunk size is checked against the configured limit before buffering
//! - Length prefixes inside a chunk are validated before allocation

pub mod binary;
pub mod codec;
pub mod header;
pub mod node_id;
pub mod security_header;
