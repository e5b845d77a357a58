use encoding_rs::{Encoding, IBM866};
use log::trace;

use crate::core_api::CoreError;

/// Distance the game shifts the upper half of its lowercase Cyrillic range.
pub const BYTE_SHIFT: u8 = 0x30;
/// Stored bytes at or above this value are shifted up before table lookup.
pub const DECODE_SHIFT_FLOOR: u8 = 0xB0;
/// Code page bytes at or above this value are shifted down after table lookup.
pub const ENCODE_SHIFT_FLOOR: u8 = 0xE0;

/// Converts between the game's shifted CP866 bytes and UTF-8 text.
///
/// The shift is applied exactly once per direction, outside the code page
/// mapping: decode undoes it before the lookup, encode reapplies it after.
#[derive(Debug, Clone, Copy)]
pub struct LegacyCodec {
    encoding: &'static Encoding,
}

impl Default for LegacyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyCodec {
    pub fn new() -> Self {
        Self { encoding: IBM866 }
    }

    /// Decode stored bytes into text, replacing every `@` with a space.
    pub fn decode(&self, bytes: &[u8]) -> Result<String, CoreError> {
        let shifted: Vec<u8> = bytes
            .iter()
            .map(|&b| {
                if b >= DECODE_SHIFT_FLOOR {
                    b.wrapping_add(BYTE_SHIFT)
                } else {
                    b
                }
            })
            .collect();

        let decoded = self
            .encoding
            .decode_without_bom_handling_and_without_replacement(&shifted)
            .ok_or_else(|| {
                CoreError::encoding(format!(
                    "{} bytes are not valid {}",
                    bytes.len(),
                    self.encoding.name()
                ))
            })?;

        let limit = bytes.len() * 4;
        if decoded.len() > limit {
            return Err(CoreError::encoding(format!(
                "decoded text needs {} bytes, limit is {}",
                decoded.len(),
                limit
            )));
        }

        trace!("decoded {} bytes into {:?}", bytes.len(), decoded);
        Ok(decoded.replace('@', " "))
    }

    /// Encode text into stored bytes. Fails on any character the code page
    /// cannot represent.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, CoreError> {
        let (encoded, _, unmappable) = self.encoding.encode(text);
        if unmappable {
            let offending = text
                .chars()
                .find(|c| {
                    let mut buf = [0u8; 4];
                    self.encoding.encode(c.encode_utf8(&mut buf)).2
                })
                .map(|c| format!(" (first: {c:?})"))
                .unwrap_or_default();
            return Err(CoreError::encoding(format!(
                "{text:?} has characters outside {}{offending}",
                self.encoding.name()
            )));
        }

        let limit = text.len() * 2;
        if encoded.len() > limit {
            return Err(CoreError::encoding(format!(
                "encoded {text:?} needs {} bytes, limit is {}",
                encoded.len(),
                limit
            )));
        }

        Ok(encoded
            .iter()
            .map(|&b| {
                if b >= ENCODE_SHIFT_FLOOR {
                    b.wrapping_sub(BYTE_SHIFT)
                } else {
                    b
                }
            })
            .collect())
    }
}
