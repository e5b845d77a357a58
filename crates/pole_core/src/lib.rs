pub mod archive;
pub mod codec;
pub mod core_api;
pub mod document;
pub mod reader;
pub mod slot;
