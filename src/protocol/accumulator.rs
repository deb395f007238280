//! Multi-chunk body accumulation.

use crate::core::header::MessageType;
use crate::error::{ProtocolError, Result};
use bytes::{Bytes, BytesMut};

/// Body bytes collected for one logical message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulatedMessage {
    pub message_type: MessageType,
    pub request_id: u32,
    pub chunk_count: usize,
    pub body: Bytes,
}

/// Collects the bodies of the chunks of one in-flight message.
///
/// Limits of 0 mean unlimited. A limit violation or a request id change
/// leaves the accumulator as it was; the pipeline decides to reset it.
#[derive(Debug)]
pub struct MessageAccumulator {
    body: BytesMut,
    chunk_count: usize,
    request_id: Option<u32>,
    message_type: Option<MessageType>,
    max_message_size: usize,
    max_chunk_count: usize,
}

impl MessageAccumulator {
    pub fn new(max_message_size: usize, max_chunk_count: usize) -> Self {
        Self {
            body: BytesMut::new(),
            chunk_count: 0,
            request_id: None,
            message_type: None,
            max_message_size,
            max_chunk_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chunk_count == 0
    }

    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Request id of the message being accumulated, if any chunk arrived.
    pub fn request_id(&self) -> Option<u32> {
        self.request_id
    }

    /// Append one chunk's body.
    pub fn push(&mut self, message_type: MessageType, request_id: u32, body: &[u8]) -> Result<()> {
        if let Some(expected) = self.request_id {
            if expected != request_id {
                return Err(ProtocolError::RequestIdMismatch {
                    expected,
                    actual: request_id,
                });
            }
        }
        let count = self.chunk_count + 1;
        if self.max_chunk_count != 0 && count > self.max_chunk_count {
            return Err(ProtocolError::TooManyChunks {
                count,
                limit: self.max_chunk_count,
            });
        }
        let size = self.body.len() + body.len();
        if self.max_message_size != 0 && size > self.max_message_size {
            return Err(ProtocolError::MessageTooLarge {
                size,
                limit: self.max_message_size,
            });
        }

        self.body.extend_from_slice(body);
        self.chunk_count = count;
        self.request_id = Some(request_id);
        self.message_type = Some(message_type);
        Ok(())
    }

    /// Hand out the completed message and start over.
    pub fn take(&mut self) -> Option<AccumulatedMessage> {
        let request_id = self.request_id.take()?;
        let message_type = self.message_type.take()?;
        let message = AccumulatedMessage {
            message_type,
            request_id,
            chunk_count: self.chunk_count,
            body: self.body.split().freeze(),
        };
        self.chunk_count = 0;
        Some(message)
    }

    /// Drop whatever has been accumulated.
    pub fn reset(&mut self) {
        self.body.clear();
        self.chunk_count = 0;
        self.request_id = None;
        self.message_type = None;
    }
}
