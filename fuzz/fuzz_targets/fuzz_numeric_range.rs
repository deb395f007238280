#![no_main]

use libfuzzer_sys::fuzz_target;
use opcua_secure_conversation::services::{ArrayValue, NumericRange};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let range = NumericRange::from(text);
    let _ = range.to_string();

    let source = ArrayValue::from((0..64).collect::<Vec<i32>>());
    let _ = range.extract_values(&source);
    let mut target = source.clone();
    let _ = range.set_values(&mut target, &ArrayValue::from(vec![0i32; 4]));
    // Matrix overlap is unsupported and panics
    if !matches!(range, NumericRange::MatrixRange(..)) {
        let _ = range.overlaps(&NumericRange::from("0:10"));
    }
});
