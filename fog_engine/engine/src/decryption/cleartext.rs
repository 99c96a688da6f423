//! Cleartext layout returned by the oracle: bytes 0..4 are x, bytes 4..8 are y, both big-endian u32.

use crate::error::{EngineError, EngineResult};

pub const CLEARTEXT_LEN: usize = 8;

pub fn encode_coordinates(x: u32, y: u32) -> [u8; CLEARTEXT_LEN] {
    let mut out = [0u8; CLEARTEXT_LEN];
    out[..4].copy_from_slice(&x.to_be_bytes());
    out[4..].copy_from_slice(&y.to_be_bytes());
    out
}

/// Anything other than exactly 8 bytes is `MalformedCleartext`.
pub fn decode_coordinates(bytes: &[u8]) -> EngineResult<(u32, u32)> {
    let bytes: &[u8; CLEARTEXT_LEN] = bytes
        .try_into()
        .map_err(|_| EngineError::MalformedCleartext(bytes.len()))?;
    let x = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let y = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    Ok((x, y))
}
