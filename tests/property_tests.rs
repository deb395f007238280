//! Property-based tests using proptest
//!
//! Invariants of the frame reader, the stream codec and numeric ranges over
//! randomly generated inputs.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use bytes::BytesMut;
use common::*;
use opcua_secure_conversation::config::PipelineConfig;
use opcua_secure_conversation::core::codec::ChunkCodec;
use opcua_secure_conversation::core::header::parse_header;
use opcua_secure_conversation::protocol::sequence::SequenceAnomaly;
use opcua_secure_conversation::protocol::{ChunkOutcome, Notification};
use opcua_secure_conversation::security::SecurityPolicy;
use opcua_secure_conversation::services::{ArrayValue, NumericRange, StatusCode};
use proptest::prelude::*;
use tokio_util::codec::Decoder;

// Property: the frame reader never panics on arbitrary bytes
proptest! {
    #[test]
    fn prop_parse_header_total(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = parse_header(&data);
    }
}

// Property: feeding garbage never panics and never leaves a message in flight
proptest! {
    #[test]
    fn prop_pipeline_survives_garbage(chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..128), 1..16)) {
        let (mut reader, _rx) = pipeline(&PipelineConfig::default());
        reader.feed(ChunkBuilder::open(SecurityPolicy::None, 1, &read_body(0)).build());
        for chunk in chunks {
            let _ = reader.feed(BytesMut::from(&chunk[..]));
        }
        let outcome = reader.feed(ChunkBuilder::msg(1000, 1000, &read_body(1)).build());
        prop_assert_eq!(outcome, ChunkOutcome::Completed);
    }
}

// Property: from any starting number, one skipped sequence number yields
// exactly one anomaly carrying (N+1, N+2)
proptest! {
    #[test]
    fn prop_single_gap_single_anomaly(start in 0u32..u32::MAX - 64, before in 0u32..16, after in 1u32..16) {
        let (mut reader, mut rx) = pipeline(&PipelineConfig::default());
        reader.feed(ChunkBuilder::open(SecurityPolicy::None, start, &read_body(0)).build());

        let last = start + before;
        for seq in start + 1..=last {
            reader.feed(ChunkBuilder::msg(seq, seq, &read_body(seq)).build());
        }
        // last + 1 is skipped
        for seq in last + 2..last + 2 + after {
            reader.feed(ChunkBuilder::msg(seq, seq, &read_body(seq)).build());
        }

        let anomalies: Vec<SequenceAnomaly> = drain(&mut rx)
            .into_iter()
            .filter_map(|n| match n {
                Notification::SequenceAnomaly(a) => Some(a),
                _ => None,
            })
            .collect();
        prop_assert_eq!(
            anomalies,
            vec![SequenceAnomaly { expected: last + 1, actual: last + 2 }]
        );
    }
}

// Property: consecutive numbers from any start never raise an anomaly
proptest! {
    #[test]
    fn prop_consecutive_no_anomaly(start in 0u32..u32::MAX - 64, count in 1u32..32) {
        let (mut reader, mut rx) = pipeline(&PipelineConfig::default());
        reader.feed(ChunkBuilder::open(SecurityPolicy::None, start, &read_body(0)).build());
        for seq in start + 1..=start + count {
            reader.feed(ChunkBuilder::msg(seq, seq, &read_body(seq)).build());
        }
        prop_assert!(!drain(&mut rx)
            .iter()
            .any(|n| matches!(n, Notification::SequenceAnomaly(_))));
    }
}

// Property: the codec reassembles chunks however the stream is split
proptest! {
    #[test]
    fn prop_codec_split_points(values in prop::collection::vec(any::<u32>(), 1..8), split in 1usize..64) {
        let chunks: Vec<BytesMut> = values
            .iter()
            .enumerate()
            .map(|(i, v)| ChunkBuilder::msg(i as u32, i as u32, &read_body(*v)).build())
            .collect();
        let stream: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();

        let mut codec = ChunkCodec::default();
        let mut buf = BytesMut::new();
        let mut framed = Vec::new();
        for piece in stream.chunks(split) {
            buf.extend_from_slice(piece);
            while let Some(chunk) = codec.decode(&mut buf).expect("valid stream") {
                framed.push(chunk);
            }
        }
        prop_assert_eq!(framed, chunks);
    }
}

// Property: valid ranges print back to the text they were parsed from
proptest! {
    #[test]
    fn prop_range_text_round_trip(lo in 0u32..10_000, width in 1u32..10_000) {
        let text = format!("{}:{}", lo, lo + width);
        let range = NumericRange::from(text.as_str());
        prop_assert_eq!(range.to_string(), text);
    }
}

// Property: parsing arbitrary text never panics and keeps invalid input
proptest! {
    #[test]
    fn prop_range_parse_total(text in "[0-9:,a-z]{0,12}") {
        let range = NumericRange::from(text.as_str());
        if let NumericRange::Invalid(original) = &range {
            prop_assert_eq!(original, &text);
        }
    }
}

// Property: an extracted slice never exceeds the source and stays in bounds
proptest! {
    #[test]
    fn prop_extract_in_bounds(len in 0usize..64, lo in 0u32..80, width in 1u32..80) {
        let source = ArrayValue::from((0..len as i32).collect::<Vec<i32>>());
        let range = NumericRange::from(format!("{}:{}", lo, lo + width).as_str());
        let out = range.extract_values(&source);
        if (lo as usize) < len {
            prop_assert_eq!(out.status, StatusCode::GOOD);
            let expected = ((lo + width) as usize).min(len - 1) - lo as usize + 1;
            prop_assert_eq!(out.values.len(), expected);
        } else {
            prop_assert_eq!(out.status, StatusCode::BAD_INDEX_RANGE_NO_DATA);
            prop_assert!(out.values.is_empty());
        }
    }
}

// Property: interval overlap is symmetric
proptest! {
    #[test]
    fn prop_overlap_symmetric(a in 0u32..50, b in 1u32..50, c in 0u32..50, d in 1u32..50) {
        let x = NumericRange::from(format!("{}:{}", a, a + b).as_str());
        let y = NumericRange::from(format!("{}:{}", c, c + d).as_str());
        prop_assert_eq!(x.overlaps(&y), y.overlaps(&x));
    }
}
