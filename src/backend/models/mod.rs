pub mod common;
pub mod distribution;
pub mod event;
pub mod legacy_config;
pub mod legacy_record;
pub mod reminder;

// Re-export common types/enums for easier access
pub use common::*;
