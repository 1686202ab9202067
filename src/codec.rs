//! Single-byte text encoding and lowercase hex strings.
use crate::error::FieldError;

/// Encodes text with one byte per character (Latin-1).
///
/// Fails on the first character whose code point exceeds 255.
pub fn bytes_of(text: &str) -> Result<Vec<u8>, FieldError> {
    text.chars()
        .enumerate()
        .map(|(position, ch)| {
            u8::try_from(ch).map_err(|_| FieldError::CharacterRange { ch, position })
        })
        .collect()
}

/// Decodes Latin-1 bytes back into text. Every byte is a valid code point.
pub fn text_of(bytes: &[u8]) -> String {
    bytes.iter().map(|b| char::from(*b)).collect()
}

/// Lowercase hex, two digits per byte, no separators.
pub fn hex_of(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Parses a hex string of even length into bytes. Accepts upper and lower case digits.
pub fn bytes_from_hex(text: &str) -> Result<Vec<u8>, FieldError> {
    hex::decode(text).map_err(|e| FieldError::InvalidShare {
        reason: format!("'{text}' is not hex: {e}"),
    })
}
