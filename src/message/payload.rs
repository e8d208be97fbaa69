//! Base64 embedding of binary payloads inside JSON messages.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Encode bytes as standard padded base64.
pub fn encode(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Decode standard padded base64.
pub fn decode(text: &str) -> crate::Result<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}
