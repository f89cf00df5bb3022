// src/backend/storage/mod.rs
// Stable memory layout and typed access helpers (ic-stable-structures).

pub mod distributions;
pub mod events;
pub mod legacies;
pub mod memory;
pub mod settings;
pub mod signatures;
pub mod storable;
pub mod tracking;

// Re-export key storage helpers for easier access
pub use memory::Memory;
pub use settings::{get_settings, set_settings, RouterSettings};
pub use storable::Cbor;
