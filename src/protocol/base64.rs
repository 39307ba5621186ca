//! Tolerant base64 helpers
//!
//! AirPlay clients are inconsistent about trailing `=` padding on base64 header
//! values (the `Apple-Challenge` header in particular is often sent with the padding
//! stripped). The standard `base64` crate engines are strict about this, so headers
//! are re-padded before decoding and responses have their padding stripped before
//! being written back out, matching what real AirPlay clients and receivers do.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Decode a base64 string that may be missing 0, 1, or 2 trailing `=` characters.
pub fn decode_tolerant(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = input.trim().trim_end_matches('=');
    let padding = (4 - trimmed.len() % 4) % 4;
    let mut padded = String::with_capacity(trimmed.len() + padding);
    padded.push_str(trimmed);
    for _ in 0..padding {
        padded.push('=');
    }
    STANDARD.decode(&padded)
}

/// Encode bytes as base64 with trailing `=` padding stripped.
#[must_use]
pub fn encode_stripped(input: &[u8]) -> String {
    STANDARD.encode(input).trim_end_matches('=').to_string()
}
