use crate::core::binary::BinaryReader;
use crate::core::node_id::ExpandedNodeId;
use crate::error::{constants, ProtocolError, Result};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, RwLock};

/// A decoded application object. The concrete type is whatever the decoder
/// registered for its type id produces.
pub type DecodedObject = Box<dyn Any + Send>;

type DecoderFn = dyn Fn(&mut BinaryReader<'_>) -> Result<DecodedObject> + Send + Sync + 'static;

/// Maps message type ids to body decoders.
///
/// Populated at startup by the schema layer. Clones share the same table, so
/// one registry can serve every channel. Decoders are cloned out of the lock
/// before they run.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: Arc<RwLock<HashMap<ExpandedNodeId, Arc<DecoderFn>>>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self {
            decoders: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a decoder producing `T` for `type_id`.
    pub fn register<T, F>(&self, type_id: impl Into<ExpandedNodeId>, decoder: F) -> Result<()>
    where
        T: Any + Send,
        F: Fn(&mut BinaryReader<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let mut decoders = self
            .decoders
            .write()
            .map_err(|_| ProtocolError::Custom(constants::ERR_REGISTRY_WRITE_LOCK.to_string()))?;

        decoders.insert(
            type_id.into(),
            Arc::new(move |reader: &mut BinaryReader<'_>| {
                decoder(reader).map(|v| Box::new(v) as DecodedObject)
            }),
        );
        Ok(())
    }

    pub fn contains(&self, type_id: &ExpandedNodeId) -> bool {
        self.decoders
            .read()
            .map(|d| d.contains_key(type_id))
            .unwrap_or(false)
    }

    /// Decode a message body with the decoder registered for `type_id`.
    ///
    /// A missing decoder is [`ProtocolError::UnknownTypeId`]. A decoder that
    /// fails or panics yields [`ProtocolError::BodyDecode`].
    pub fn decode(
        &self,
        type_id: &ExpandedNodeId,
        reader: &mut BinaryReader<'_>,
    ) -> Result<DecodedObject> {
        let decoder = {
            let decoders = self.decoders.read().map_err(|_| {
                ProtocolError::Custom(constants::ERR_REGISTRY_READ_LOCK.to_string())
            })?;
            decoders
                .get(type_id)
                .cloned()
                .ok_or_else(|| ProtocolError::UnknownTypeId(type_id.clone()))?
        };

        match catch_unwind(AssertUnwindSafe(|| decoder(reader))) {
            Ok(Ok(object)) => Ok(object),
            Ok(Err(e)) => Err(ProtocolError::BodyDecode {
                type_id: type_id.clone(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ProtocolError::BodyDecode {
                type_id: type_id.clone(),
                reason: constants::ERR_DECODER_PANICKED.to_string(),
            }),
        }
    }
}
