// src/backend/services/legacy_service.rs
// Escalation, eligibility and the one-shot claim for the time-escalating
// kinds. The multisig quorum path lives in multisig_service.

use crate::{
    adapter::{TokenClient, WalletPolicyClient},
    error::LegacyError,
    models::{
        common::*,
        distribution::DistributionLedger,
        event::EventKind,
        legacy_record::LegacyRecord,
    },
    storage,
    storage::settings::get_settings,
    utils::crypto::{self, SignedAuthorization},
};
use candid::CandidType;
use serde::Deserialize;

/// What a successful claim did: which tier it executed at and every payout
/// that went through.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct ClaimOutcome {
    pub layer: Layer,
    pub transfers: Vec<PayoutRecord>,
}

#[derive(CandidType, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PayoutRecord {
    pub asset: AssetId,
    pub beneficiary: PrincipalId,
    pub amount: u128,
}

/// The fallback governing a tier, if any. Layer 3 inherits the layer 2
/// fallback when no dedicated one is set.
fn effective_fallback(
    record: &LegacyRecord,
    layer: Layer,
) -> Option<crate::models::legacy_config::FallbackDistribution> {
    match layer {
        Layer::Layer1 => None,
        Layer::Layer2 => record.fallback_layer2.clone(),
        Layer::Layer3 => record.fallback_layer3.clone().or_else(|| record.fallback_layer2.clone()),
    }
}

/// Per-asset recipient plan at the given tier. A governing fallback takes
/// over the whole distribution; otherwise the ledger shares apply.
fn resolve_plan(
    record: &LegacyRecord,
    ledger: &DistributionLedger,
    layer: Layer,
    asset: &AssetId,
) -> Vec<(PrincipalId, Percent)> {
    if let Some(fb) = effective_fallback(record, layer) {
        return vec![(fb.beneficiary, fb.percent)];
    }
    ledger
        .beneficiaries()
        .iter()
        .map(|b| (*b, ledger.percent_of(asset, b)))
        .filter(|(_, pct)| *pct > 0)
        .collect()
}

/// Whether `candidate` would receive anything at the given tier.
fn is_recipient(
    record: &LegacyRecord,
    ledger: &DistributionLedger,
    layer: Layer,
    candidate: &PrincipalId,
) -> bool {
    if let Some(fb) = effective_fallback(record, layer) {
        return fb.beneficiary == *candidate;
    }
    ledger.is_beneficiary(candidate)
}

/// Every asset a claim will walk: the ledger's tracked assets plus native
/// escrow when funded.
fn claimable_assets(escrow: u64, ledger: &DistributionLedger) -> Vec<AssetId> {
    let mut assets = ledger.all_assets().to_vec();
    if escrow > 0 && !assets.contains(&AssetId::Native) {
        assets.push(AssetId::Native);
    }
    assets
}

/// Read-only eligibility probe for clients: the current tier and whether
/// the window has elapsed.
pub fn claim_status(id: LegacyId, now: TimestampNs) -> Result<(Layer, bool), LegacyError> {
    let record = storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))?;
    Ok((record.current_layer(now), record.is_active() && record.window_elapsed(now)))
}

/// One-shot activation and distribution. The record turns terminal before
/// any asset moves, so re-entry or retry can never pay twice; individual
/// transfer failures are logged and skipped, never rolled back.
pub async fn claim<T: TokenClient, W: WalletPolicyClient>(
    caller: PrincipalId,
    engine: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    auth: SignedAuthorization,
    tokens: &T,
    wallet: &W,
) -> Result<ClaimOutcome, LegacyError> {
    let record = storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))?;
    if record.kind == LegacyKind::Multisig {
        return Err(LegacyError::InvalidInput(
            "multisig legacies activate through sign_activation".to_string(),
        ));
    }
    if !record.is_active() {
        return Err(LegacyError::LegacyNotActive);
    }
    if !record.window_elapsed(now) {
        return Err(LegacyError::NotEligibleYet);
    }

    let layer = record.current_layer(now);
    let ledger = storage::distributions::get_ledger(id);
    if !is_recipient(&record, &ledger, layer, &caller) {
        return Err(LegacyError::NotBeneficiary);
    }

    let settings = get_settings();
    crypto::verify_beneficiary_authorization(
        settings.domain_id,
        record.kind.router_kind(),
        id,
        &record.owner,
        &caller,
        &auth,
    )?;

    // The asset source: the owner's own account, or the policy-checked
    // custody wallet.
    let source = match record.kind {
        LegacyKind::Custodied => {
            let custody = record.custody_wallet.ok_or_else(|| {
                LegacyError::InternalError("custodied record without wallet".to_string())
            })?;
            if !wallet.module_enabled(&custody, &settings.custody_module).await? {
                return Err(LegacyError::ModuleInvalid);
            }
            match wallet.current_guard(&custody).await? {
                Some(guard) if guard == engine => {}
                _ => return Err(LegacyError::GuardInvalid),
            }
            custody
        }
        _ => record.owner,
    };

    // The policy lookups above awaited for the custodied kind; another
    // claim may have finished in the meantime. Re-read before going
    // terminal so activation stays exactly-once.
    let mut record = storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))?;
    if !record.is_active() {
        return Err(LegacyError::LegacyNotActive);
    }

    // Terminal before the first transfer awaits.
    record.status = LegacyStatus::Activated;
    record.updated_at_ns = now;
    let escrow = record.escrowed_native;
    record.escrowed_native = 0;
    storage::legacies::insert_legacy(&record);
    storage::tracking::untrack(id);
    storage::events::add_event(id, caller, now, EventKind::Activated { layer: Some(layer) });
    crate::log_info!("⏳ LEGACY: Activated legacy {} at {:?} by {}", id, layer, caller);

    let mut transfers = Vec::new();
    for asset in claimable_assets(escrow, &ledger) {
        let base = match &asset {
            AssetId::Native => escrow as u128,
            token => {
                let balance = tokens.balance_of(token, &source).await.unwrap_or(0);
                let allowance = tokens.allowance(token, &source, &engine).await.unwrap_or(0);
                balance.min(allowance)
            }
        };
        if base == 0 {
            continue;
        }

        // Floor division per recipient; sub-percent dust never leaves the
        // source (or the escrow, for native).
        let payouts: Vec<(PrincipalId, u128)> = resolve_plan(&record, &ledger, layer, &asset)
            .into_iter()
            .map(|(beneficiary, percent)| (beneficiary, base * percent as u128 / 100))
            .filter(|(_, amount)| *amount > 0)
            .collect();
        if payouts.is_empty() {
            continue;
        }

        // Pull exactly what will be paid out, once, then split from the
        // engine's own balance.
        if !asset.is_native() {
            let total: u128 = payouts.iter().map(|(_, amount)| amount).sum();
            if let Err(e) = tokens.transfer_from(&asset, &source, &engine, total).await {
                crate::log_warn!("⏳ LEGACY: Pull of {} for legacy {} failed: {}", asset, id, e);
                continue;
            }
        }

        for (beneficiary, amount) in payouts {
            match tokens.transfer(&asset, &beneficiary, amount).await {
                Ok(()) => {
                    storage::events::add_event(
                        id,
                        caller,
                        now,
                        EventKind::Transferred {
                            asset: asset.clone(),
                            beneficiary,
                            amount,
                        },
                    );
                    transfers.push(PayoutRecord { asset: asset.clone(), beneficiary, amount });
                }
                Err(e) => {
                    crate::log_warn!(
                        "⏳ LEGACY: Payout of {} {} to {} failed: {}",
                        amount, asset, beneficiary, e
                    );
                }
            }
        }
    }

    Ok(ClaimOutcome { layer, transfers })
}
