// src/backend/services/router_service.rs
// Creation, ownership and registry logic for all legacy kinds.

use crate::{
    adapter::{TokenClient, WalletPolicyClient},
    error::LegacyError,
    models::{
        common::*,
        distribution::DistributionLedger,
        event::EventKind,
        legacy_config::{
            Distribution, FallbackDistribution, LegacyMainConfig, MultisigConfig,
            MultisigMainConfig, MultisigRoster, TimingConfig,
        },
        legacy_record::LegacyRecord,
    },
    storage,
    storage::legacies::OwnerStats,
    storage::settings::{get_settings, RouterSettings},
    utils::crypto::{self, SignedAuthorization},
    utils::time::ns_to_secs,
};
use candid::{CandidType, Principal};
use serde::Deserialize;

/// Everything needed to create a time-escalating legacy.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct CreateLegacyArgs {
    /// `DirectTransfer` or `Custodied`; multisig has its own args.
    pub kind: LegacyKind,
    pub main: LegacyMainConfig,
    pub timing: TimingConfig,
    pub fallback_layer2: Option<FallbackDistribution>,
    pub fallback_layer3: Option<FallbackDistribution>,
    /// Required for the custodied kind, rejected otherwise.
    pub custody_wallet: Option<PrincipalId>,
    /// Unix seconds embedded in the signed consent message.
    pub timestamp_secs: u64,
    pub auth: SignedAuthorization,
}

#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct CreateMultisigArgs {
    pub main: MultisigMainConfig,
    pub config: MultisigConfig,
    pub timestamp_secs: u64,
    pub auth: SignedAuthorization,
}

/// The address the owner's NEXT legacy will be created at. Pure; calling it
/// never advances the nonce, so clients sign over it before creating.
pub fn next_legacy_address(owner: &PrincipalId) -> Principal {
    let stats = storage::legacies::get_owner_stats(owner);
    crypto::derive_legacy_principal(owner, stats.nonce + 1)
}

fn check_signature_freshness(
    settings: &RouterSettings,
    now: TimestampNs,
    timestamp_secs: u64,
) -> Result<(), LegacyError> {
    let now_secs = ns_to_secs(now);
    // Future-dated consents are as unverifiable as stale ones.
    if timestamp_secs > now_secs
        || now_secs - timestamp_secs > settings.max_signature_age_secs
    {
        return Err(LegacyError::SignatureExpired);
    }
    Ok(())
}

fn check_timing(timing: &TimingConfig) -> Result<(), LegacyError> {
    if timing.inactivity_window_secs == 0 {
        return Err(LegacyError::InvalidInput(
            "inactivity window must be positive".to_string(),
        ));
    }
    Ok(())
}

fn check_fallback(
    owner: &PrincipalId,
    fallback: &Option<FallbackDistribution>,
) -> Result<(), LegacyError> {
    if let Some(fb) = fallback {
        if fb.beneficiary == Principal::anonymous() || fb.beneficiary == *owner {
            return Err(LegacyError::BeneficiaryInvalid);
        }
        if fb.percent == 0 || fb.percent > 100 {
            return Err(LegacyError::InvalidPercent);
        }
    }
    Ok(())
}

fn check_owner_capacity(
    settings: &RouterSettings,
    stats: &OwnerStats,
) -> Result<(), LegacyError> {
    if stats.count >= settings.legacy_limit {
        return Err(LegacyError::LegacyLimitExceeded);
    }
    Ok(())
}

/// Pulls the creation fee from the caller. A failed pull surfaces as
/// `NotEnoughFee` whatever the ledger's exact complaint was.
async fn collect_fee<T: TokenClient>(
    tokens: &T,
    settings: &RouterSettings,
    caller: &PrincipalId,
) -> Result<(), LegacyError> {
    if settings.fee_e8s == 0 {
        return Ok(());
    }
    tokens
        .transfer_from(
            &AssetId::Native,
            caller,
            &settings.fee_receiver,
            settings.fee_e8s as u128,
        )
        .await
        .map_err(|_| LegacyError::NotEnoughFee)
}

fn validate_roster(
    settings: &RouterSettings,
    owner: &PrincipalId,
    main: &MultisigMainConfig,
    min_required: u32,
) -> Result<MultisigRoster, LegacyError> {
    if main.beneficiaries.is_empty() {
        return Err(LegacyError::NotHaveAnyBeneficiaries);
    }
    if main.nick_names.len() != main.beneficiaries.len() {
        return Err(LegacyError::TwoArraysLengthMismatch);
    }
    if main.assets.is_empty() {
        return Err(LegacyError::EmptyArray);
    }
    for (i, beneficiary) in main.beneficiaries.iter().enumerate() {
        if *beneficiary == Principal::anonymous() || beneficiary == owner {
            return Err(LegacyError::BeneficiaryInvalid);
        }
        if main.beneficiaries[..i].contains(beneficiary) {
            return Err(LegacyError::BeneficiaryInvalid);
        }
    }
    if main.beneficiaries.len() > settings.beneficiary_limit as usize {
        return Err(LegacyError::BeneficiaryLimitExceeded);
    }
    if min_required == 0 || min_required as usize > main.beneficiaries.len() {
        return Err(LegacyError::MinRequiredSignaturesInvalid);
    }

    let mut assets = Vec::new();
    for asset in &main.assets {
        if !assets.contains(asset) {
            assets.push(asset.clone());
        }
    }
    Ok(MultisigRoster {
        beneficiaries: main.beneficiaries.clone(),
        nick_names: main.nick_names.clone(),
        assets,
    })
}

/// Loads a legacy the caller owns and that is still live. Lookup, ownership
/// and terminal-state failures in that order.
fn load_active_owned(
    id: LegacyId,
    caller: &PrincipalId,
) -> Result<LegacyRecord, LegacyError> {
    let record = storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))?;
    if record.owner != *caller {
        return Err(LegacyError::OnlyOwner);
    }
    if !record.is_active() {
        return Err(LegacyError::LegacyNotActive);
    }
    Ok(record)
}

/// Creates a time-escalating legacy at the owner's predicted address.
pub async fn create_legacy<T: TokenClient, W: WalletPolicyClient>(
    caller: PrincipalId,
    engine: PrincipalId,
    now: TimestampNs,
    args: CreateLegacyArgs,
    tokens: &T,
    wallet: &W,
) -> Result<LegacyRecord, LegacyError> {
    if args.kind == LegacyKind::Multisig {
        return Err(LegacyError::InvalidInput(
            "use create_multisig_legacy for the multisig kind".to_string(),
        ));
    }

    let settings = get_settings();
    let stats = storage::legacies::get_owner_stats(&caller);
    check_owner_capacity(&settings, &stats)?;

    let predicted = crypto::derive_legacy_principal(&caller, stats.nonce + 1);
    check_signature_freshness(&settings, now, args.timestamp_secs)?;
    crypto::verify_creation(&caller, &predicted, args.timestamp_secs, &args.auth)?;

    check_timing(&args.timing)?;
    let mut ledger = DistributionLedger::default();
    ledger.apply(caller, &args.main.distributions, &args.main.nick_names, false)?;
    if ledger.beneficiaries().len() > settings.beneficiary_limit as usize {
        return Err(LegacyError::BeneficiaryLimitExceeded);
    }
    check_fallback(&caller, &args.fallback_layer2)?;
    check_fallback(&caller, &args.fallback_layer3)?;
    if let Some(fb) = &args.fallback_layer2 {
        ledger.set_nickname(fb.beneficiary, fb.nick_name.clone());
    }
    if let Some(fb) = &args.fallback_layer3 {
        ledger.set_nickname(fb.beneficiary, fb.nick_name.clone());
    }

    let custody_wallet = match args.kind {
        LegacyKind::Custodied => {
            let custody = args.custody_wallet.ok_or_else(|| {
                LegacyError::InvalidInput("custodied legacy requires a wallet".to_string())
            })?;
            if !wallet.module_enabled(&custody, &settings.custody_module).await? {
                return Err(LegacyError::ModuleInvalid);
            }
            match wallet.current_guard(&custody).await? {
                Some(guard) if guard != engine => {
                    return Err(LegacyError::ExistedGuardConflict)
                }
                _ => {}
            }
            Some(custody)
        }
        _ => {
            if args.custody_wallet.is_some() {
                return Err(LegacyError::InvalidInput(
                    "custody wallet only applies to the custodied kind".to_string(),
                ));
            }
            None
        }
    };

    collect_fee(tokens, &settings, &caller).await?;
    // The fee pull awaited; another create by this owner may have landed in
    // the meantime. The nonce moving means this consent signature is spent.
    if storage::legacies::get_owner_stats(&caller).nonce != stats.nonce {
        return Err(LegacyError::SignatureInvalid);
    }

    let id = storage::legacies::next_legacy_id();
    let record = LegacyRecord {
        id,
        address: predicted,
        owner: caller,
        kind: args.kind,
        status: LegacyStatus::Active,
        name: args.main.name.clone(),
        note: args.main.note.clone(),
        timing: args.timing,
        min_required_signatures: 0,
        roster: None,
        custody_wallet,
        fallback_layer2: args.fallback_layer2,
        fallback_layer3: args.fallback_layer3,
        last_activity_ns: now,
        escrowed_native: 0,
        created_at_ns: now,
        updated_at_ns: now,
    };
    storage::legacies::insert_legacy(&record);
    storage::distributions::put_ledger(id, &ledger);
    storage::legacies::set_owner_stats(
        &caller,
        OwnerStats { nonce: stats.nonce + 1, count: stats.count + 1 },
    );
    storage::tracking::track(id);
    storage::events::add_event(id, caller, now, EventKind::Created { legacy_kind: record.kind });
    crate::log_info!("⚖️ ROUTER: Created legacy {} for owner {}", id, caller);
    Ok(record)
}

/// Creates a multisig legacy. Same consent signature scheme; the quorum and
/// roster replace the percent ledger.
pub async fn create_multisig_legacy<T: TokenClient>(
    caller: PrincipalId,
    now: TimestampNs,
    args: CreateMultisigArgs,
    tokens: &T,
) -> Result<LegacyRecord, LegacyError> {
    let settings = get_settings();
    let stats = storage::legacies::get_owner_stats(&caller);
    check_owner_capacity(&settings, &stats)?;

    let predicted = crypto::derive_legacy_principal(&caller, stats.nonce + 1);
    check_signature_freshness(&settings, now, args.timestamp_secs)?;
    crypto::verify_creation(&caller, &predicted, args.timestamp_secs, &args.auth)?;

    if args.config.inactivity_window_secs == 0 {
        return Err(LegacyError::InvalidInput(
            "inactivity window must be positive".to_string(),
        ));
    }
    let roster = validate_roster(
        &settings,
        &caller,
        &args.main,
        args.config.min_required_signatures,
    )?;

    collect_fee(tokens, &settings, &caller).await?;
    if storage::legacies::get_owner_stats(&caller).nonce != stats.nonce {
        return Err(LegacyError::SignatureInvalid);
    }

    let id = storage::legacies::next_legacy_id();
    let record = LegacyRecord {
        id,
        address: predicted,
        owner: caller,
        kind: LegacyKind::Multisig,
        status: LegacyStatus::Active,
        name: args.main.name.clone(),
        note: args.main.note.clone(),
        timing: TimingConfig {
            inactivity_window_secs: args.config.inactivity_window_secs,
            delay_layer2_secs: 0,
            delay_layer3_secs: 0,
        },
        min_required_signatures: args.config.min_required_signatures,
        roster: Some(roster),
        custody_wallet: None,
        fallback_layer2: None,
        fallback_layer3: None,
        last_activity_ns: now,
        escrowed_native: 0,
        created_at_ns: now,
        updated_at_ns: now,
    };
    storage::legacies::insert_legacy(&record);
    storage::legacies::set_owner_stats(
        &caller,
        OwnerStats { nonce: stats.nonce + 1, count: stats.count + 1 },
    );
    storage::tracking::track(id);
    storage::events::add_event(id, caller, now, EventKind::Created { legacy_kind: record.kind });
    crate::log_info!("⚖️ ROUTER: Created multisig legacy {} for owner {}", id, caller);
    Ok(record)
}

/// Owner-only deletion. Refunds escrowed native funds, wipes the ledger and
/// collected signatures, and frees a slot against the owner's limit. The
/// nonce is deliberately left alone so derived addresses never repeat.
pub async fn delete_legacy<T: TokenClient>(
    caller: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    tokens: &T,
) -> Result<u64, LegacyError> {
    let mut record = load_active_owned(id, &caller)?;

    // Terminal state lands before the refund awaits, so a message running
    // while the transfer is outstanding cannot delete or claim this legacy
    // a second time.
    let refunded = record.escrowed_native;
    record.status = LegacyStatus::Deleted;
    record.escrowed_native = 0;
    record.updated_at_ns = now;
    storage::legacies::insert_legacy(&record);
    storage::distributions::remove_ledger(id);
    storage::signatures::remove_signers(id);
    storage::tracking::untrack(id);

    let stats = storage::legacies::get_owner_stats(&caller);
    storage::legacies::set_owner_stats(
        &caller,
        OwnerStats { nonce: stats.nonce, count: stats.count.saturating_sub(1) },
    );
    storage::events::add_event(id, caller, now, EventKind::Deleted { refunded });

    if refunded > 0 {
        if let Err(e) = tokens
            .transfer(&AssetId::Native, &record.owner, refunded as u128)
            .await
        {
            crate::log_warn!(
                "⚖️ ROUTER: Refund of {} e8s for deleted legacy {} failed: {}",
                refunded,
                id,
                e
            );
        }
    }
    crate::log_info!("⚖️ ROUTER: Deleted legacy {}, refunded {} e8s", id, refunded);
    Ok(refunded)
}

/// Pulls native funds from the owner into the legacy's escrow. Counts as
/// owner activity.
pub async fn deposit_native<T: TokenClient>(
    caller: PrincipalId,
    engine: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    amount: u64,
    tokens: &T,
) -> Result<u64, LegacyError> {
    if amount == 0 {
        return Err(LegacyError::InvalidInput("amount must be positive".to_string()));
    }
    load_active_owned(id, &caller)?;
    tokens
        .transfer_from(&AssetId::Native, &caller, &engine, amount as u128)
        .await?;
    // Re-read after the pull: the record may have moved while the call was
    // outstanding, and crediting a stale copy would drop that movement.
    let mut record = storage::legacies::get_legacy(id)
        .ok_or(LegacyError::LegacyNotFound(id))?;
    if !record.is_active() {
        // Funds are already pulled; push them back rather than strand them.
        if let Err(e) = tokens
            .transfer(&AssetId::Native, &caller, amount as u128)
            .await
        {
            crate::log_warn!(
                "⚖️ ROUTER: Returning deposit of {} e8s for legacy {} failed: {}",
                amount,
                id,
                e
            );
        }
        return Err(LegacyError::LegacyNotActive);
    }
    record.escrowed_native += amount;
    record.touch(now);
    storage::legacies::insert_legacy(&record);
    storage::tracking::reset_stage(id);
    storage::events::add_event(id, caller, now, EventKind::NativeDeposited { amount });
    Ok(record.escrowed_native)
}

/// Owner withdrawal from escrow. Partial amounts allowed; counts as owner
/// activity.
pub async fn withdraw_native<T: TokenClient>(
    caller: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    amount: u64,
    tokens: &T,
) -> Result<u64, LegacyError> {
    let mut record = load_active_owned(id, &caller)?;
    if amount == 0 || amount > record.escrowed_native {
        return Err(LegacyError::NotEnoughNative);
    }
    // Debit before the transfer awaits, so a withdrawal racing this one
    // sees the reduced escrow instead of spending the same funds twice.
    record.escrowed_native -= amount;
    record.touch(now);
    storage::legacies::insert_legacy(&record);
    storage::tracking::reset_stage(id);
    if let Err(e) = tokens
        .transfer(&AssetId::Native, &record.owner, amount as u128)
        .await
    {
        // Nothing left the ledger; put the debit back.
        let mut current = storage::legacies::get_legacy(id)
            .ok_or(LegacyError::LegacyNotFound(id))?;
        current.escrowed_native += amount;
        storage::legacies::insert_legacy(&current);
        return Err(e);
    }
    storage::events::add_event(id, caller, now, EventKind::NativeWithdrawn { amount });
    Ok(storage::legacies::get_legacy(id)
        .map(|r| r.escrowed_native)
        .unwrap_or(0))
}

/// Replaces the distribution submission for a time-escalating legacy. Zero
/// percents remove shares; the update that removes everyone is rejected.
pub fn set_legacy_distributions(
    caller: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    distributions: Vec<Distribution>,
    nick_names: Vec<String>,
) -> Result<(), LegacyError> {
    let mut record = load_active_owned(id, &caller)?;
    if record.kind == LegacyKind::Multisig {
        return Err(LegacyError::InvalidInput(
            "multisig legacies use set_legacy_beneficiaries".to_string(),
        ));
    }
    let settings = get_settings();
    let mut ledger = storage::distributions::get_ledger(id);
    ledger.apply(caller, &distributions, &nick_names, true)?;
    if ledger.beneficiaries().len() > settings.beneficiary_limit as usize {
        return Err(LegacyError::BeneficiaryLimitExceeded);
    }
    storage::distributions::put_ledger(id, &ledger);
    record.touch(now);
    storage::legacies::insert_legacy(&record);
    storage::tracking::reset_stage(id);
    storage::events::add_event(id, caller, now, EventKind::DistributionUpdated);
    Ok(())
}

/// Replaces the multisig roster and quorum. Collected signatures are
/// discarded; the quorum restarts against the new membership.
pub fn set_legacy_beneficiaries(
    caller: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    main: MultisigMainConfig,
    min_required_signatures: u32,
) -> Result<(), LegacyError> {
    let mut record = load_active_owned(id, &caller)?;
    if record.kind != LegacyKind::Multisig {
        return Err(LegacyError::InvalidInput(
            "only multisig legacies carry a roster".to_string(),
        ));
    }
    let settings = get_settings();
    let roster = validate_roster(&settings, &caller, &main, min_required_signatures)?;
    record.roster = Some(roster);
    record.min_required_signatures = min_required_signatures;
    record.name = main.name;
    record.note = main.note;
    record.touch(now);
    storage::legacies::insert_legacy(&record);
    storage::signatures::remove_signers(id);
    storage::tracking::reset_stage(id);
    storage::events::add_event(id, caller, now, EventKind::DistributionUpdated);
    Ok(())
}

/// Updates name, note and timing. Counts as owner activity and rewinds the
/// keeper stage since every boundary moved.
pub fn set_legacy_config(
    caller: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    name: String,
    note: String,
    timing: TimingConfig,
) -> Result<(), LegacyError> {
    let mut record = load_active_owned(id, &caller)?;
    check_timing(&timing)?;
    record.name = name;
    record.note = note;
    record.timing = timing;
    record.touch(now);
    storage::legacies::insert_legacy(&record);
    storage::tracking::reset_stage(id);
    storage::events::add_event(id, caller, now, EventKind::ConfigUpdated);
    Ok(())
}

/// Explicit heartbeat: proves the owner is alive without changing anything.
pub fn keep_alive(caller: PrincipalId, now: TimestampNs, id: LegacyId) -> Result<(), LegacyError> {
    let mut record = load_active_owned(id, &caller)?;
    record.touch(now);
    storage::legacies::insert_legacy(&record);
    storage::tracking::reset_stage(id);
    Ok(())
}

pub fn get_legacy(id: LegacyId) -> Result<LegacyRecord, LegacyError> {
    storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))
}

pub fn get_legacies_of(owner: &PrincipalId) -> Vec<LegacyRecord> {
    storage::legacies::legacy_ids_of(owner)
        .into_iter()
        .filter_map(storage::legacies::get_legacy)
        .collect()
}

/// Percent of `asset` assigned to `beneficiary`, zero when unassigned.
pub fn get_distribution(id: LegacyId, asset: &AssetId, beneficiary: &PrincipalId) -> Percent {
    storage::distributions::get_ledger(id).percent_of(asset, beneficiary)
}

/// Beneficiaries with their display labels. Multisig reads the roster,
/// everything else the ledger.
pub fn get_beneficiaries(id: LegacyId) -> Result<Vec<(PrincipalId, String)>, LegacyError> {
    let record = get_legacy(id)?;
    if let Some(roster) = &record.roster {
        return Ok(roster
            .beneficiaries
            .iter()
            .cloned()
            .zip(roster.nick_names.iter().cloned())
            .collect());
    }
    let ledger = storage::distributions::get_ledger(id);
    Ok(ledger
        .beneficiaries()
        .iter()
        .map(|b| (*b, ledger.nickname(b)))
        .collect())
}
