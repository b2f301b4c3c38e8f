//! Lossless-as-possible decoding of child output.

use std::borrow::Cow;

/// Decode bytes as UTF-8, falling back to ASCII with `\xNN` escapes.
///
/// Valid UTF-8 is borrowed unchanged. Anything else is re-encoded byte by
/// byte: ASCII bytes pass through and every other byte becomes a
/// lowercase `\xNN` escape, so the original bytes remain recoverable from
/// the text. This never fails.
pub fn safe_decode(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => Cow::Owned(escape_non_ascii(bytes)),
    }
}

fn escape_non_ascii(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() + 8);
    for &byte in bytes {
        if byte.is_ascii() {
            out.push(byte as char);
        } else {
            out.push_str(&format!("\\x{:02x}", byte));
        }
    }
    out
}
