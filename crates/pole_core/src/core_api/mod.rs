mod engine;
mod error;
mod types;

pub use engine::Engine;
pub use error::{CoreError, CoreErrorCode};
pub use types::{EngineOptions, MIN_PACK_ENTRIES, PackSummary, UnpackSummary};
