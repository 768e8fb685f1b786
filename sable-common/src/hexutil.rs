//! Hex encoding helpers shared across the engine.

use crate::{Error, Result};

/// Encode bytes as a 0x-prefixed lowercase hex string.
pub fn encode_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Encode bytes as a 0x-prefixed hex string zero-left-padded to 32 bytes.
///
/// Commitments and nullifier hashes are fixed-width on the wire even when
/// the underlying value has leading zero bytes. Inputs must not exceed
/// 32 bytes.
pub fn encode_hex32_padded(bytes: &[u8]) -> String {
    debug_assert!(
        bytes.len() <= 32,
        "value wider than 32 bytes: {} bytes",
        bytes.len()
    );
    let mut padded = [0u8; 32];
    let offset = 32usize.saturating_sub(bytes.len());
    let tail = &bytes[bytes.len().saturating_sub(32)..];
    padded[offset..].copy_from_slice(tail);
    encode_hex_prefixed(&padded)
}

/// Decode a hex string, with or without the 0x prefix.
pub fn decode_hex(value: &str) -> Result<Vec<u8>> {
    let stripped = value.strip_prefix("0x").unwrap_or(value);
    hex::decode(stripped).map_err(|_| Error::InvalidHex(value.to_string()))
}
