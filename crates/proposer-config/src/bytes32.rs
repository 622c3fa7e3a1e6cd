//! Custom decoding for 32-byte hex fields that may arrive minimal-length.
//!
//! Rollup config JSON (`system_config.overhead`, `system_config.scalar`) encodes
//! 32-byte values as hex strings but does not always zero-pad them to full width —
//! `"0x1"` and `"0x000...0001"` (64 hex digits) must decode to the same value. This
//! module models that as a newtype with a custom `Deserialize` routine, left-padding
//! before decoding and rejecting anything that still isn't exactly 32 bytes.

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// A 32-byte value that deserializes from minimal-length or full-length `"0x…"` hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Bytes32(#[serde(with = "hex_bytes32")] pub [u8; 32]);

impl Bytes32 {
    pub fn decode(field: &'static str, s: &str) -> Result<Self> {
        Ok(Self(decode_padded(field, s)?))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for Bytes32 {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        decode_padded("bytes32", &s)
            .map(Bytes32)
            .map_err(D::Error::custom)
    }
}

/// Left-pads the hex digits of `s` (after an optional `0x` prefix) to 64 characters,
/// decodes, and rejects anything that isn't exactly 32 bytes once decoded.
fn decode_padded(field: &'static str, s: &str) -> Result<[u8; 32]> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    let padded = if digits.len() < 64 {
        format!("{:0>64}", digits)
    } else {
        digits.to_string()
    };

    let bytes = hex::decode(&padded)
        .map_err(|_| Error::BadNumericField { field, value: s.to_string() })?;

    if bytes.len() != 32 {
        return Err(Error::BadBytes32Length { field, len: bytes.len() });
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(&bytes);
    Ok(out)
}

mod hex_bytes32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        super::decode_padded("bytes32", &s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_and_full_length_hex_decode_equal() {
        let minimal = Bytes32::decode("system_config.scalar", "0x1").unwrap();
        let full = Bytes32::decode(
            "system_config.scalar",
            &format!("0x{}{}", "0".repeat(63), "1"),
        )
        .unwrap();
        assert_eq!(minimal, full);
    }

    #[test]
    fn oversized_hex_is_rejected() {
        let too_long = format!("0x{}", "0".repeat(66));
        assert!(Bytes32::decode("system_config.overhead", &too_long).is_err());
    }

    #[test]
    fn decode_without_prefix_still_pads() {
        let with_prefix = Bytes32::decode("x", "0xabcd").unwrap();
        let without_prefix = Bytes32::decode("x", "abcd").unwrap();
        assert_eq!(with_prefix, without_prefix);
    }
}
