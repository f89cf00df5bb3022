// src/backend/error.rs
use candid::CandidType;
use serde::Deserialize;
use thiserror::Error;

/// Machine-readable rejection reasons. Every failed call maps to exactly one
/// variant; nothing in the engine panics on bad input.
#[derive(CandidType, Deserialize, Error, Debug, Clone, PartialEq, Eq)]
pub enum LegacyError {
    // --- Validation ---
    #[error("Two arrays must have the same length")]
    TwoArraysLengthMismatch,

    #[error("Asset list must not be empty")]
    EmptyArray,

    #[error("Percent out of range or per-asset total exceeds 100")]
    InvalidPercent,

    #[error("Beneficiary is the zero/anonymous principal or the owner")]
    BeneficiaryInvalid,

    #[error("Distribution leaves no beneficiary with a nonzero share")]
    NotHaveAnyBeneficiaries,

    #[error("Min required signatures must be in 1..=beneficiary count")]
    MinRequiredSignaturesInvalid,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Authorization ---
    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Creation signature is older than the allowed window")]
    SignatureExpired,

    #[error("Caller is not a beneficiary eligible at the current layer")]
    NotBeneficiary,

    #[error("Activation conditions not met yet")]
    NotEligibleYet,

    #[error("Only the legacy owner may perform this action")]
    OnlyOwner,

    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    // --- Policy limits ---
    #[error("Per-owner legacy limit reached")]
    LegacyLimitExceeded,

    #[error("Beneficiary count limit reached")]
    BeneficiaryLimitExceeded,

    #[error("Attached fee payment is below the configured legacy fee")]
    NotEnoughFee,

    #[error("Requested amount exceeds the escrowed native balance")]
    NotEnoughNative,

    // --- Lookup / terminal state ---
    #[error("Legacy not found: {0}")]
    LegacyNotFound(u64),

    #[error("Legacy is already activated or deleted")]
    LegacyNotActive,

    // --- External collaborators ---
    #[error("Custodied wallet guard mismatch")]
    GuardInvalid,

    #[error("Custodied wallet policy module is not enabled")]
    ModuleInvalid,

    #[error("Custodied wallet already carries a conflicting guard")]
    ExistedGuardConflict,

    #[error("Asset transfer failed: {0}")]
    TransferFailed(String),

    // --- Automation ---
    #[error("No pending notification boundary for this action")]
    NothingPending,

    #[error("Internal canister error: {0}")]
    InternalError(String),
}
