use serde::{Deserialize, Serialize};

use crate::slot::LengthPolicy;

/// Fewest word lines a document must have before it is packed.
pub const MIN_PACK_ENTRIES: usize = 3;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineOptions {
    pub length_policy: LengthPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnpackSummary {
    /// Count stored in the header; 0 when it holds no leading digits.
    pub expected_count: u64,
    pub actual_count: usize,
    pub sections: usize,
}

impl UnpackSummary {
    pub fn count_matches(&self) -> bool {
        self.expected_count == self.actual_count as u64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackSummary {
    /// `[key]` lines seen, repeats included.
    pub keys: usize,
    pub entries: usize,
    /// Fields cut down to the 20 byte payload.
    pub truncated: usize,
}
