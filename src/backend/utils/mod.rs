// src/backend/utils/mod.rs
pub mod crypto;
pub mod guards;
pub mod logger;
pub mod time;
