// src/backend/models/distribution.rs
use crate::error::LegacyError;
use crate::models::common::{AssetId, Percent, PrincipalId};
use crate::models::legacy_config::Distribution;
use candid::{CandidType, Principal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-legacy ledger of asset shares: `(asset, beneficiary) -> percent`,
/// plus the insertion-ordered set of every asset ever referenced (needed to
/// enumerate on claim) and the beneficiary/nickname bookkeeping.
///
/// All writes go through [`DistributionLedger::apply`], which is
/// all-or-nothing: a rejected submission leaves the ledger untouched.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct DistributionLedger {
    shares: BTreeMap<AssetId, BTreeMap<PrincipalId, Percent>>,
    /// Running per-asset percent totals, maintained incrementally on every
    /// write so validation never rescans all beneficiaries.
    totals: BTreeMap<AssetId, u16>,
    /// Every asset ever referenced, in first-reference order. Never evicted,
    /// even when all its shares drop to zero.
    assets: Vec<AssetId>,
    /// Beneficiaries holding at least one nonzero share, in first-write order.
    beneficiaries: Vec<PrincipalId>,
    nick_names: BTreeMap<PrincipalId, String>,
}

impl DistributionLedger {
    /// Processes a submission left-to-right into the ledger. Later entries
    /// for the same `(asset, beneficiary)` overwrite earlier ones.
    ///
    /// `allow_zero` distinguishes creation (zero percents rejected) from
    /// owner updates (zero percent removes that share).
    pub fn apply(
        &mut self,
        owner: PrincipalId,
        distributions: &[Distribution],
        nick_names: &[String],
        allow_zero: bool,
    ) -> Result<(), LegacyError> {
        if nick_names.len() != distributions.len() {
            return Err(LegacyError::TwoArraysLengthMismatch);
        }

        // Validate and write into a scratch copy; commit only on full success.
        let mut next = self.clone();
        for (dist, nick) in distributions.iter().zip(nick_names.iter()) {
            if dist.beneficiary == Principal::anonymous() || dist.beneficiary == owner {
                return Err(LegacyError::BeneficiaryInvalid);
            }
            if dist.assets.len() != dist.percents.len() {
                return Err(LegacyError::TwoArraysLengthMismatch);
            }
            if dist.assets.is_empty() {
                return Err(LegacyError::EmptyArray);
            }
            for (asset, pct) in dist.assets.iter().zip(dist.percents.iter()) {
                if *pct > 100 || (*pct == 0 && !allow_zero) {
                    return Err(LegacyError::InvalidPercent);
                }
                next.write_share(asset, dist.beneficiary, *pct)?;
            }
            next.nick_names.insert(dist.beneficiary, nick.clone());
        }

        next.prune_beneficiaries();
        if next.beneficiaries.is_empty() {
            return Err(LegacyError::NotHaveAnyBeneficiaries);
        }

        *self = next;
        Ok(())
    }

    fn write_share(
        &mut self,
        asset: &AssetId,
        beneficiary: PrincipalId,
        percent: Percent,
    ) -> Result<(), LegacyError> {
        if !self.assets.contains(asset) {
            self.assets.push(asset.clone());
        }
        let per_asset = self.shares.entry(asset.clone()).or_default();
        let previous = if percent == 0 {
            per_asset.remove(&beneficiary).unwrap_or(0)
        } else {
            per_asset.insert(beneficiary, percent).unwrap_or(0)
        };

        let total = self.totals.entry(asset.clone()).or_insert(0);
        *total = *total - previous as u16 + percent as u16;
        if *total > 100 {
            return Err(LegacyError::InvalidPercent);
        }

        if percent > 0 && !self.beneficiaries.contains(&beneficiary) {
            self.beneficiaries.push(beneficiary);
        }
        Ok(())
    }

    /// Drops beneficiaries whose every share is zero, and their nicknames.
    fn prune_beneficiaries(&mut self) {
        let shares = &self.shares;
        self.beneficiaries
            .retain(|b| shares.values().any(|per_asset| per_asset.get(b).copied().unwrap_or(0) > 0));
        let keep: Vec<PrincipalId> = self.beneficiaries.clone();
        self.nick_names.retain(|b, _| keep.contains(b));
    }

    pub fn percent_of(&self, asset: &AssetId, beneficiary: &PrincipalId) -> Percent {
        self.shares
            .get(asset)
            .and_then(|per_asset| per_asset.get(beneficiary))
            .copied()
            .unwrap_or(0)
    }

    pub fn asset_total(&self, asset: &AssetId) -> u16 {
        self.totals.get(asset).copied().unwrap_or(0)
    }

    /// Every asset ever referenced, in first-reference order.
    pub fn all_assets(&self) -> &[AssetId] {
        &self.assets
    }

    /// Beneficiaries with at least one nonzero share.
    pub fn beneficiaries(&self) -> &[PrincipalId] {
        &self.beneficiaries
    }

    pub fn is_beneficiary(&self, candidate: &PrincipalId) -> bool {
        self.beneficiaries.contains(candidate)
    }

    pub fn nickname(&self, beneficiary: &PrincipalId) -> String {
        self.nick_names.get(beneficiary).cloned().unwrap_or_default()
    }

    pub fn set_nickname(&mut self, beneficiary: PrincipalId, nickname: String) {
        self.nick_names.insert(beneficiary, nickname);
    }
}
