#![no_main]

use libfuzzer_sys::fuzz_target;
use opcua_secure_conversation::core::header::parse_header;

fuzz_target!(|data: &[u8]| {
    // Frame reader must reject, never panic
    if let Ok(info) = parse_header(data) {
        assert!(info.body_offset <= data.len());
    }
});
