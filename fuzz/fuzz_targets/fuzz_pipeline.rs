#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use opcua_secure_conversation::config::PipelineConfig;
use opcua_secure_conversation::protocol::{DecoderRegistry, NullSink, SecureMessageReader};
use opcua_secure_conversation::security::CryptoFactories;

fuzz_target!(|data: &[u8]| {
    let mut reader = SecureMessageReader::new(
        &PipelineConfig::default(),
        DecoderRegistry::new(),
        CryptoFactories::new(),
        NullSink,
    );

    // First byte picks a split point so multi-chunk sequences get exercised
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let split = (split as usize).min(rest.len());
    let (first, second) = rest.split_at(split);
    let _ = reader.feed(BytesMut::from(first));
    let _ = reader.feed(BytesMut::from(second));
});
