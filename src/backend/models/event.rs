// src/backend/models/event.rs
use crate::models::common::{AssetId, Layer, LegacyId, LegacyKind, PrincipalId, TimestampNs};
use crate::models::reminder::NotificationStage;
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Append-only audit record. Events are never rewritten or deleted, even
/// when their legacy is.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LegacyEvent {
    pub id: u64,
    pub legacy_id: LegacyId,
    pub actor: PrincipalId,
    pub at_ns: TimestampNs,
    pub kind: EventKind,
}

#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub enum EventKind {
    Created { legacy_kind: LegacyKind },
    ConfigUpdated,
    DistributionUpdated,
    NativeDeposited { amount: u64 },
    NativeWithdrawn { amount: u64 },
    SignatureAdded { signer: PrincipalId },
    Activated { layer: Option<Layer> },
    Transferred { asset: AssetId, beneficiary: PrincipalId, amount: u128 },
    Deleted { refunded: u64 },
    ReminderSent { stage: NotificationStage },
}
