use log::warn;
use serde::{Deserialize, Serialize};

use crate::core_api::{CoreError, CoreErrorCode};

pub const SLOT_PAYLOAD_LEN: usize = 20;
pub const SLOT_LEN: usize = SLOT_PAYLOAD_LEN + 1;

/// What to do with a length byte that claims more than the payload holds.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthPolicy {
    #[default]
    Clamp,
    Reject,
}

/// One on-disk field: a length byte followed by a zero-padded payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    pub declared_len: u8,
    pub payload: [u8; SLOT_PAYLOAD_LEN],
}

impl Slot {
    pub fn new(payload_bytes: &[u8]) -> Self {
        let len = payload_bytes.len().min(SLOT_PAYLOAD_LEN);
        let mut payload = [0u8; SLOT_PAYLOAD_LEN];
        payload[..len].copy_from_slice(&payload_bytes[..len]);
        Self {
            declared_len: len as u8,
            payload,
        }
    }

    /// The leading payload bytes the length byte marks as significant.
    pub fn significant(&self, policy: LengthPolicy) -> Result<&[u8], CoreError> {
        let declared = usize::from(self.declared_len);
        if declared <= SLOT_PAYLOAD_LEN {
            return Ok(&self.payload[..declared]);
        }
        match policy {
            LengthPolicy::Clamp => {
                warn!(
                    "slot length {} exceeds {} byte payload, clamping",
                    declared, SLOT_PAYLOAD_LEN
                );
                Ok(&self.payload[..])
            }
            LengthPolicy::Reject => Err(CoreError::new(
                CoreErrorCode::InvalidLength,
                format!(
                    "slot length {} exceeds {} byte payload",
                    declared, SLOT_PAYLOAD_LEN
                ),
            )),
        }
    }

    pub fn to_bytes(&self) -> [u8; SLOT_LEN] {
        let mut out = [0u8; SLOT_LEN];
        out[0] = self.declared_len;
        out[1..].copy_from_slice(&self.payload);
        out
    }
}

/// Frame payload bytes as a slot. Anything past 20 bytes is dropped.
pub fn pack_slot(payload_bytes: &[u8]) -> [u8; SLOT_LEN] {
    Slot::new(payload_bytes).to_bytes()
}
