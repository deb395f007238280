//! Hex dumps for diagnostics.

/// Bytes shown per line.
const WIDTH: usize = 16;

/// Render `bytes` as offset-prefixed hex lines with an ASCII column.
///
/// ```text
/// 00000000  4d 53 47 46 18 00 00 00 07 00 00 00 01 00 00 00  MSGF............
/// ```
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() / WIDTH * 80 + 80);
    for (line, chunk) in bytes.chunks(WIDTH).enumerate() {
        let hex = hex::encode(chunk);
        let mut grouped = String::with_capacity(WIDTH * 3);
        for (i, pair) in hex.as_bytes().chunks(2).enumerate() {
            if i > 0 {
                grouped.push(' ');
            }
            grouped.push_str(std::str::from_utf8(pair).unwrap_or("??"));
        }
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        out.push_str(&format!(
            "{:08x}  {:<width$}  {}\n",
            line * WIDTH,
            grouped,
            ascii,
            width = WIDTH * 3 - 1
        ));
    }
    out
}
