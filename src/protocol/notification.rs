//! # Pipeline Notifications
//!
//! Everything the pipeline reports goes out as a [`Notification`] through a
//! [`NotificationSink`], synchronously, from inside
//! [`feed`](crate::protocol::pipeline::SecureMessageReader::feed). A sink
//! that panics is caught at the call site and logged; the pipeline state is
//! not affected.

use crate::core::header::MessageType;
use crate::core::node_id::ExpandedNodeId;
use crate::error::{constants, ProtocolError};
use crate::protocol::registry::DecodedObject;
use crate::protocol::sequence::SequenceAnomaly;
use bytes::Bytes;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tokio::sync::mpsc;
use tracing::error;

/// A fully decoded application message.
pub struct DecodedMessage {
    pub type_id: ExpandedNodeId,
    pub body: DecodedObject,
    pub message_type: MessageType,
    pub request_id: u32,
    pub channel_id: u32,
}

impl DecodedMessage {
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.body.downcast_ref()
    }

    /// Take the body as `T`, or get the message back if it is something else.
    pub fn downcast<T: Any>(self) -> Result<Box<T>, Self> {
        let DecodedMessage {
            type_id,
            body,
            message_type,
            request_id,
            channel_id,
        } = self;
        body.downcast::<T>().map_err(|body| DecodedMessage {
            type_id,
            body,
            message_type,
            request_id,
            channel_id,
        })
    }
}

impl fmt::Debug for DecodedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedMessage")
            .field("type_id", &self.type_id)
            .field("message_type", &self.message_type)
            .field("request_id", &self.request_id)
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

/// Where in the pipeline an error happened.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub channel_id: Option<u32>,
    pub message_type: Option<MessageType>,
    pub request_id: Option<u32>,
    pub type_id: Option<ExpandedNodeId>,
    /// Offending bytes, when dumping them is enabled.
    pub dump: Option<Bytes>,
}

#[derive(Debug)]
pub enum Notification {
    MessageDecoded(DecodedMessage),
    SequenceAnomaly(SequenceAnomaly),
    /// Older tokens were retired; traffic now uses `token_id`.
    TokenRenewed { token_id: u32 },
    PipelineError {
        error: ProtocolError,
        context: ErrorContext,
    },
}

/// Receiver of pipeline notifications.
pub trait NotificationSink: Send {
    fn notify(&mut self, notification: Notification);
}

impl NotificationSink for mpsc::UnboundedSender<Notification> {
    fn notify(&mut self, notification: Notification) {
        // a closed receiver means nobody is listening any more
        let _ = self.send(notification);
    }
}

/// Adapts a closure into a [`NotificationSink`].
pub struct FnSink<F>(pub F);

impl<F> NotificationSink for FnSink<F>
where
    F: FnMut(Notification) + Send,
{
    fn notify(&mut self, notification: Notification) {
        (self.0)(notification)
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn notify(&mut self, _notification: Notification) {}
}

/// Deliver a notification, containing any panic raised by the sink.
pub(crate) fn deliver(sink: &mut dyn NotificationSink, notification: Notification) {
    if catch_unwind(AssertUnwindSafe(|| sink.notify(notification))).is_err() {
        crate::utils::metrics::global_metrics().dispatch_failure();
        error!("{}", constants::ERR_SINK_PANICKED);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::core::node_id::NodeId;

    fn decoded(value: u32) -> DecodedMessage {
        DecodedMessage {
            type_id: NodeId::numeric(0, 1).into(),
            body: Box::new(value),
            message_type: MessageType::Message,
            request_id: 3,
            channel_id: 4,
        }
    }

    #[test]
    fn test_downcast() {
        let msg = decoded(12);
        assert_eq!(msg.downcast_ref::<u32>(), Some(&12));
        let msg = msg.downcast::<String>().unwrap_err();
        assert_eq!(*msg.downcast::<u32>().unwrap(), 12);
    }

    #[test]
    fn test_panicking_sink_is_contained() {
        let mut sink = FnSink(|_n: Notification| panic!("consumer bug"));
        deliver(&mut sink, Notification::TokenRenewed { token_id: 1 });
    }

    #[test]
    fn test_channel_sink() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        deliver(&mut tx, Notification::TokenRenewed { token_id: 8 });
        assert!(matches!(
            rx.try_recv().unwrap(),
            Notification::TokenRenewed { token_id: 8 }
        ));
        drop(rx);
        // closed receiver is not an error
        deliver(&mut tx, Notification::TokenRenewed { token_id: 9 });
    }
}
