// src/backend/services/mod.rs
pub mod automation_service;
pub mod legacy_service;
pub mod multisig_service;
pub mod router_service;
