//! # Secure Message Pipeline
//!
//! [`SecureMessageReader`] turns the chunks of one secure channel into
//! decoded application messages. Each call to [`feed`](SecureMessageReader::feed)
//! runs one chunk to completion:
//!
//! ```text
//! parse_header -> policy -> decrypt/verify -> sequence check -> accumulate -> decode -> notify
//! ```
//!
//! The reader owns all per-channel state (security context, token store,
//! sequence number, in-flight message) and takes `&mut self`, so the host
//! serializes chunks per channel simply by owning one reader per channel.
//! Errors never escape `feed`: they drop the in-flight message, are counted,
//! and go out as [`Notification::PipelineError`]. Token and sequence state
//! stay usable for the next chunk.

use crate::config::PipelineConfig;
use crate::core::binary::BinaryReader;
use crate::core::header::{parse_header, ChunkType, HeaderInfo, MessageType, SecurityHeader};
use crate::core::node_id::ExpandedNodeId;
use crate::core::security_header::{AsymmetricSecurityHeader, SequenceHeader};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::accumulator::{AccumulatedMessage, MessageAccumulator};
use crate::protocol::decrypt;
use crate::protocol::notification::{
    deliver, DecodedMessage, ErrorContext, Notification, NotificationSink,
};
use crate::protocol::registry::DecoderRegistry;
use crate::protocol::sequence::SequenceValidator;
use crate::security::context::{PrivateKey, SecurityContext};
use crate::security::crypto::CryptoFactories;
use crate::security::derived_keys::DerivedKeys;
use crate::security::policy::{MessageSecurityMode, SecurityPolicy};
use crate::security::token_store::{SecurityToken, TokenStore};
use crate::services::status::StatusCode;
use crate::utils::hexdump;
use crate::utils::metrics::{global_metrics, Timer};
use bytes::BytesMut;
use tracing::{debug, error, instrument, warn};

/// What a single chunk did to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkOutcome {
    /// Intermediate chunk accumulated; more are expected.
    Pending,
    /// A message was decoded and handed to the sink.
    Completed,
    /// The chunk failed a check; the in-flight message was dropped.
    Rejected,
    /// The sender aborted the in-flight message.
    Aborted,
    /// The peer sent an ERR chunk.
    RemoteError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Idle,
    Receiving,
    /// The last chunk was rejected. Diagnostic only: the next chunk is
    /// processed normally.
    Faulted,
}

pub struct SecureMessageReader {
    channel_id: Option<u32>,
    security: SecurityContext,
    tokens: TokenStore,
    sequence: SequenceValidator,
    accumulator: MessageAccumulator,
    registry: DecoderRegistry,
    factories: CryptoFactories,
    sink: Box<dyn NotificationSink>,
    status: PipelineStatus,
    max_chunk_size: usize,
    dump_on_decode_error: bool,
}

impl SecureMessageReader {
    pub fn new(
        config: &PipelineConfig,
        registry: DecoderRegistry,
        factories: CryptoFactories,
        sink: impl NotificationSink + 'static,
    ) -> Self {
        Self {
            channel_id: None,
            security: SecurityContext::new(),
            tokens: TokenStore::new(),
            sequence: SequenceValidator::new(),
            accumulator: MessageAccumulator::new(config.max_message_size, config.max_chunk_count),
            registry,
            factories,
            sink: Box::new(sink),
            status: PipelineStatus::Idle,
            max_chunk_size: config.max_chunk_size,
            dump_on_decode_error: config.dump_on_decode_error,
        }
    }

    /// Start from an existing security context instead of an unset one.
    pub fn with_security(mut self, security: SecurityContext) -> Self {
        self.security = security;
        self
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    /// Secure channel id of the last secured chunk.
    pub fn channel_id(&self) -> Option<u32> {
        self.channel_id
    }

    pub fn security(&self) -> &SecurityContext {
        &self.security
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Largest chunk accepted by [`feed`](Self::feed); framing a stream for
    /// this reader should use the same limit.
    pub fn max_chunk_size(&self) -> usize {
        self.max_chunk_size
    }

    pub fn previous_sequence_number(&self) -> Option<u32> {
        self.sequence.previous()
    }

    /// Fix the negotiated mode and policy.
    ///
    /// # Panics
    /// Panics if security was already set for this channel.
    pub fn set_security(&mut self, mode: MessageSecurityMode, policy: SecurityPolicy) {
        self.security.set_security(mode, policy);
        if policy.is_secure() {
            match self.factories.get(policy) {
                Ok(factory) => self.security.set_factory(factory),
                Err(e) => warn!(%policy, error = %e, "no crypto factory for negotiated policy"),
            }
        }
    }

    pub fn set_private_key(&mut self, key: PrivateKey) {
        self.security.set_private_key(key);
    }

    /// Add a token issued by the negotiation layer.
    ///
    /// # Panics
    /// Panics if a token with the same id is already stored.
    pub fn push_new_token(&mut self, token: SecurityToken, derived_keys: Option<DerivedKeys>) {
        self.tokens.push(token, derived_keys);
    }

    pub fn expire_token(&mut self, token_id: u32) -> bool {
        self.tokens.expire(token_id)
    }

    /// Process one complete chunk.
    #[instrument(skip(self, chunk), fields(len = chunk.len()), level = "debug")]
    pub fn feed(&mut self, chunk: BytesMut) -> ChunkOutcome {
        let _timer = Timer::start("chunk_processing");
        global_metrics().chunk_received(chunk.len());

        let mut context = ErrorContext::default();
        if self.dump_on_decode_error {
            context.dump = Some(chunk.clone().freeze());
        }

        match self.process(chunk, &mut context) {
            Ok(outcome) => {
                self.status = match outcome {
                    ChunkOutcome::Pending => PipelineStatus::Receiving,
                    _ => PipelineStatus::Idle,
                };
                outcome
            }
            Err(error) => self.fail(error, context),
        }
    }

    fn process(&mut self, chunk: BytesMut, context: &mut ErrorContext) -> Result<ChunkOutcome> {
        if chunk.len() > self.max_chunk_size {
            return Err(ProtocolError::OversizedChunk {
                size: chunk.len(),
                limit: self.max_chunk_size,
            });
        }

        let info = parse_header(&chunk)?;
        let message_type = info.header.message_type;
        context.message_type = Some(message_type);
        context.channel_id = info.channel_id;

        let body = match &info.security_header {
            SecurityHeader::None => return self.process_unsecured(&info, &chunk),
            SecurityHeader::Asymmetric(header) => {
                self.open_asymmetric(chunk, info.body_offset, header)?
            }
            SecurityHeader::Symmetric(header) => {
                self.open_symmetric(chunk, info.body_offset, header.token_id)?
            }
        };
        if info.channel_id.is_some() {
            self.channel_id = info.channel_id;
        }

        let mut reader = BinaryReader::new(&body);
        let sequence = SequenceHeader::decode(&mut reader).map_err(|_| {
            ProtocolError::InvalidHeader(constants::ERR_TRUNCATED_SEQUENCE_HEADER)
        })?;
        context.request_id = Some(sequence.request_id);
        if let Some(anomaly) = self.sequence.check(sequence.sequence_number) {
            global_metrics().sequence_anomaly();
            deliver(&mut *self.sink, Notification::SequenceAnomaly(anomaly));
        }
        let payload = reader.rest();

        match info.header.chunk_type {
            ChunkType::Intermediate => {
                self.accumulator
                    .push(message_type, sequence.request_id, payload)?;
                Ok(ChunkOutcome::Pending)
            }
            ChunkType::Abort => {
                self.accumulator.reset();
                let (status, reason) = decode_abort_body(payload);
                Err(ProtocolError::MessageAborted {
                    request_id: sequence.request_id,
                    status,
                    reason,
                })
            }
            ChunkType::Final => {
                self.accumulator
                    .push(message_type, sequence.request_id, payload)?;
                match self.accumulator.take() {
                    Some(message) => self.dispatch(message, context),
                    None => Err(ProtocolError::Custom("empty message accumulator".into())),
                }
            }
        }
    }

    /// HEL, ACK, RHE and ERR.
    fn process_unsecured(&mut self, info: &HeaderInfo, chunk: &[u8]) -> Result<ChunkOutcome> {
        let message_type = info.header.message_type;
        if message_type == MessageType::Error {
            let mut reader = BinaryReader::new(&chunk[info.body_offset..]);
            let status = StatusCode(reader.read_u32()?);
            let reason = reader.read_string()?.unwrap_or_default();
            error!(%status, %reason, "error received from peer");
            return Err(ProtocolError::RemoteError { status, reason });
        }
        self.security.force_none()?;
        Err(ProtocolError::UnexpectedMessage(message_type))
    }

    /// Resolve the OPN's policy and factory, verify the chunk, and only then
    /// commit the policy and sender certificate to the channel.
    fn open_asymmetric(
        &mut self,
        chunk: BytesMut,
        body_offset: usize,
        header: &AsymmetricSecurityHeader,
    ) -> Result<BytesMut> {
        let policy = SecurityPolicy::from_uri(&header.security_policy_uri);
        if policy == SecurityPolicy::Invalid {
            return Err(ProtocolError::UnsupportedSecurityPolicy(
                header.security_policy_uri.clone(),
            ));
        }
        self.security.check_open(policy)?;
        let factory = if policy.is_secure() {
            Some(self.factories.get(policy)?)
        } else {
            None
        };

        let body = decrypt::open_asymmetric(
            chunk,
            body_offset,
            header,
            policy,
            factory.as_deref(),
            self.security.private_key(),
        )?;
        self.security
            .apply_open(policy, factory, header.sender_certificate.clone())?;
        Ok(body)
    }

    fn open_symmetric(
        &mut self,
        mut chunk: BytesMut,
        body_offset: usize,
        token_id: u32,
    ) -> Result<BytesMut> {
        match (self.security.policy(), self.security.mode()) {
            (SecurityPolicy::Invalid, _) => Err(ProtocolError::SecurityError(
                constants::ERR_SECURITY_NOT_ESTABLISHED,
            )),
            (SecurityPolicy::None, _) | (_, MessageSecurityMode::None) => {
                Ok(chunk.split_off(body_offset))
            }
            (_, MessageSecurityMode::Invalid) => Err(ProtocolError::SecurityError(
                constants::ERR_SECURITY_MODE_NOT_SET,
            )),
            _ => {
                let selection = self.tokens.select_matching(token_id);
                if selection.renewed {
                    global_metrics().token_renewed();
                    deliver(&mut *self.sink, Notification::TokenRenewed { token_id });
                }
                let Some(entry) = selection.entry else {
                    global_metrics().token_rejected();
                    return Err(ProtocolError::UnknownToken(token_id));
                };
                decrypt::open_symmetric(chunk, body_offset, entry, &self.security).map_err(|e| {
                    if matches!(e, ProtocolError::ExpiredToken(_)) {
                        global_metrics().token_rejected();
                    }
                    e
                })
            }
        }
    }

    fn dispatch(
        &mut self,
        message: AccumulatedMessage,
        context: &mut ErrorContext,
    ) -> Result<ChunkOutcome> {
        if self.dump_on_decode_error {
            context.dump = Some(message.body.clone());
        }
        let mut reader = BinaryReader::new(&message.body);
        let type_id = ExpandedNodeId::decode(&mut reader)
            .map_err(|e| ProtocolError::Decoding(format!("message type id: {e}")))?;
        context.type_id = Some(type_id.clone());

        let body = self.registry.decode(&type_id, &mut reader)?;

        global_metrics().message_decoded();
        debug!(
            %type_id,
            message_type = %message.message_type,
            request_id = message.request_id,
            chunks = message.chunk_count,
            "message decoded"
        );
        deliver(
            &mut *self.sink,
            Notification::MessageDecoded(DecodedMessage {
                type_id,
                body,
                message_type: message.message_type,
                request_id: message.request_id,
                channel_id: self.channel_id.unwrap_or_default(),
            }),
        );
        Ok(ChunkOutcome::Completed)
    }

    fn fail(&mut self, error: ProtocolError, context: ErrorContext) -> ChunkOutcome {
        self.accumulator.reset();
        let outcome = match error {
            ProtocolError::MessageAborted { .. } => {
                global_metrics().message_aborted();
                self.status = PipelineStatus::Idle;
                ChunkOutcome::Aborted
            }
            ProtocolError::RemoteError { .. } => {
                self.status = PipelineStatus::Faulted;
                ChunkOutcome::RemoteError
            }
            _ => {
                global_metrics().chunk_rejected();
                if matches!(
                    error,
                    ProtocolError::UnknownTypeId(_) | ProtocolError::BodyDecode { .. }
                ) {
                    global_metrics().decode_error();
                }
                self.status = PipelineStatus::Faulted;
                ChunkOutcome::Rejected
            }
        };

        warn!(
            error = %error,
            status = %error.status_code(),
            channel_id = ?context.channel_id,
            message_type = ?context.message_type,
            request_id = ?context.request_id,
            "chunk rejected"
        );
        if let Some(dump) = &context.dump {
            debug!("offending bytes:\n{}", hexdump::hex_dump(dump));
        }

        deliver(
            &mut *self.sink,
            Notification::PipelineError { error, context },
        );
        outcome
    }
}

/// Status and reason carried by an abort chunk. Missing fields fall back to
/// `BadRequestInterrupted` and an empty reason.
fn decode_abort_body(payload: &[u8]) -> (StatusCode, String) {
    let mut reader = BinaryReader::new(payload);
    let status = reader
        .read_u32()
        .map(StatusCode)
        .unwrap_or(StatusCode::BAD_REQUEST_INTERRUPTED);
    let reason = reader.read_string().ok().flatten().unwrap_or_default();
    (status, reason)
}
