// src/backend/models/legacy_config.rs
use crate::models::common::{AssetId, Percent, PrincipalId};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// One beneficiary's requested shares, index-aligned `assets[i] -> percents[i]`.
/// Duplicate `(asset, beneficiary)` pairs across one submission resolve
/// last-write-wins, not additively.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Distribution {
    pub beneficiary: PrincipalId,
    pub assets: Vec<AssetId>,
    pub percents: Vec<Percent>,
}

/// Main configuration for the time-escalating variants.
/// `nick_names` is index-aligned to `distributions` (display labels only).
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LegacyMainConfig {
    pub name: String,
    pub note: String,
    pub nick_names: Vec<String>,
    pub distributions: Vec<Distribution>,
}

/// Main configuration for the multisig variant: flat beneficiary list plus
/// the asset list the equal-split claim will enumerate.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MultisigMainConfig {
    pub name: String,
    pub note: String,
    pub nick_names: Vec<String>,
    pub beneficiaries: Vec<PrincipalId>,
    pub assets: Vec<AssetId>,
}

/// Fallback beneficiary for layer 2 or 3: one account receiving `percent`
/// of every claimed asset once its tier is reached.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct FallbackDistribution {
    pub beneficiary: PrincipalId,
    pub percent: Percent,
    pub nick_name: String,
}

/// Timing knobs for the time-escalating variants. All in seconds.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub struct TimingConfig {
    /// Owner inactivity before layer 1 beneficiaries may claim.
    pub inactivity_window_secs: u64,
    /// Additional delay before the layer 2 fallback unlocks.
    pub delay_layer2_secs: u64,
    /// Additional delay before the layer 3 fallback unlocks.
    pub delay_layer3_secs: u64,
}

/// Resolved multisig membership stored on the record: who may sign, their
/// labels, and which assets the equal-split claim enumerates.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct MultisigRoster {
    pub beneficiaries: Vec<PrincipalId>,
    pub nick_names: Vec<String>,
    pub assets: Vec<AssetId>,
}

/// Extra configuration for the multisig variant.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Copy)]
pub struct MultisigConfig {
    pub min_required_signatures: u32,
    /// Inactivity gate before signature collection may begin at all.
    pub inactivity_window_secs: u64,
}
