// src/backend/models/common.rs
use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};

pub type PrincipalId = Principal; // General principal identifier
pub type LegacyId = u64;          // Sequential id assigned by the router
pub type TimestampNs = u64;       // Nanoseconds since epoch
pub type Percent = u8;            // Share of an asset, 0..=100

pub const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Lifecycle status of a legacy. `Activated` and `Deleted` are terminal:
/// every mutating entry point rejects them before doing anything else.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub enum LegacyStatus {
    Active,
    Activated,
    Deleted,
}

/// Which flavor of legacy a record is.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub enum LegacyKind {
    /// Time-escalating, assets pulled from the owner's own account via allowance.
    DirectTransfer,
    /// Time-escalating, assets held by an externally-custodied wallet whose
    /// policy module/guard must be validated before claims are trusted.
    Custodied,
    /// Signature-quorum variant, no layer escalation.
    Multisig,
}

impl LegacyKind {
    /// Domain-separation constant mixed into beneficiary authorization
    /// messages so a signature for one router variant cannot be replayed
    /// against another.
    pub fn router_kind(&self) -> u8 {
        match self {
            LegacyKind::Multisig => 1,
            LegacyKind::Custodied => 2,
            LegacyKind::DirectTransfer => 3,
        }
    }
}

/// Escalation tier of a time-escalating legacy. Never stored; always
/// recomputed from `now - last_activity`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Copy)]
pub enum Layer {
    Layer1,
    Layer2,
    Layer3,
}

/// An asset the engine can move: either the native ledger token escrowed by
/// the engine itself, or an external token ledger canister.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetId {
    Native,
    Token(Principal),
}

impl AssetId {
    pub fn is_native(&self) -> bool {
        matches!(self, AssetId::Native)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetId::Native => write!(f, "native"),
            AssetId::Token(p) => write!(f, "{}", p),
        }
    }
}
