// src/backend/api.rs
// Candid API endpoint definitions (query/update functions).

use crate::{
    adapter::{
        mail_adapter::RelayMailClient, token_adapter::LedgerTokenClient,
        wallet_adapter::CanisterWalletClient,
    },
    error::LegacyError,
    models::{
        common::*,
        event::LegacyEvent,
        legacy_config::{
            Distribution, FallbackDistribution, LegacyMainConfig, MultisigConfig,
            MultisigMainConfig, TimingConfig,
        },
        legacy_record::LegacyRecord,
        reminder::{PendingAction, ReminderConfig},
    },
    services::{
        automation_service,
        legacy_service::{self, ClaimOutcome},
        multisig_service::{self, SignOutcome},
        router_service::{self, CreateLegacyArgs, CreateMultisigArgs},
    },
    storage::settings::{self, RouterSettings},
    utils::crypto::SignedAuthorization,
    utils::guards::{check_admin, check_keeper, check_not_anonymous},
    utils::time::get_current_time_ns,
};
use candid::{CandidType, Deserialize, Principal};
use ic_cdk::caller;
use ic_cdk_macros::{query, update};
use validator::Validate;

// --- Validation Helper ---
fn validate_request<T: Validate>(req: &T) -> Result<(), LegacyError> {
    req.validate()
        .map_err(|e| LegacyError::InvalidInput(e.to_string()))
}

fn authenticated() -> Result<Principal, LegacyError> {
    let caller = caller();
    check_not_anonymous(&caller)?;
    Ok(caller)
}

// --- Request Structs ---

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct CreateLegacyRequest {
    pub kind: LegacyKind,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub note: String,
    pub nick_names: Vec<String>,
    pub distributions: Vec<Distribution>,
    pub timing: TimingConfig,
    pub fallback_layer2: Option<FallbackDistribution>,
    pub fallback_layer3: Option<FallbackDistribution>,
    pub custody_wallet: Option<Principal>,
    pub timestamp_secs: u64,
    pub auth: SignedAuthorization,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct CreateMultisigRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub note: String,
    pub nick_names: Vec<String>,
    pub beneficiaries: Vec<Principal>,
    pub assets: Vec<AssetId>,
    pub min_required_signatures: u32,
    pub inactivity_window_secs: u64,
    pub timestamp_secs: u64,
    pub auth: SignedAuthorization,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct UpdateBeneficiariesRequest {
    pub legacy_id: LegacyId,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub note: String,
    pub nick_names: Vec<String>,
    pub beneficiaries: Vec<Principal>,
    pub assets: Vec<AssetId>,
    pub min_required_signatures: u32,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct UpdateConfigRequest {
    pub legacy_id: LegacyId,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 500))]
    pub note: String,
    pub timing: TimingConfig,
}

#[derive(CandidType, Deserialize, Clone, Debug, Validate)]
pub struct RegisterReminderRequest {
    #[validate(email)]
    pub email: String,
    pub time_prior_activation_secs: u64,
}

// --- Creation / Registry ---

#[update]
async fn create_legacy(req: CreateLegacyRequest) -> Result<LegacyRecord, LegacyError> {
    let caller = authenticated()?;
    validate_request(&req)?;
    let args = CreateLegacyArgs {
        kind: req.kind,
        main: LegacyMainConfig {
            name: req.name,
            note: req.note,
            nick_names: req.nick_names,
            distributions: req.distributions,
        },
        timing: req.timing,
        fallback_layer2: req.fallback_layer2,
        fallback_layer3: req.fallback_layer3,
        custody_wallet: req.custody_wallet,
        timestamp_secs: req.timestamp_secs,
        auth: req.auth,
    };
    router_service::create_legacy(
        caller,
        ic_cdk::id(),
        get_current_time_ns(),
        args,
        &LedgerTokenClient,
        &CanisterWalletClient,
    )
    .await
}

#[update]
async fn create_multisig_legacy(req: CreateMultisigRequest) -> Result<LegacyRecord, LegacyError> {
    let caller = authenticated()?;
    validate_request(&req)?;
    let args = CreateMultisigArgs {
        main: MultisigMainConfig {
            name: req.name,
            note: req.note,
            nick_names: req.nick_names,
            beneficiaries: req.beneficiaries,
            assets: req.assets,
        },
        config: MultisigConfig {
            min_required_signatures: req.min_required_signatures,
            inactivity_window_secs: req.inactivity_window_secs,
        },
        timestamp_secs: req.timestamp_secs,
        auth: req.auth,
    };
    router_service::create_multisig_legacy(caller, get_current_time_ns(), args, &LedgerTokenClient)
        .await
}

#[update]
async fn delete_legacy(legacy_id: LegacyId) -> Result<u64, LegacyError> {
    let caller = authenticated()?;
    router_service::delete_legacy(caller, get_current_time_ns(), legacy_id, &LedgerTokenClient)
        .await
}

#[update]
async fn deposit_native(legacy_id: LegacyId, amount: u64) -> Result<u64, LegacyError> {
    let caller = authenticated()?;
    router_service::deposit_native(
        caller,
        ic_cdk::id(),
        get_current_time_ns(),
        legacy_id,
        amount,
        &LedgerTokenClient,
    )
    .await
}

#[update]
async fn withdraw_native(legacy_id: LegacyId, amount: u64) -> Result<u64, LegacyError> {
    let caller = authenticated()?;
    router_service::withdraw_native(
        caller,
        get_current_time_ns(),
        legacy_id,
        amount,
        &LedgerTokenClient,
    )
    .await
}

#[update]
fn set_legacy_distributions(
    legacy_id: LegacyId,
    distributions: Vec<Distribution>,
    nick_names: Vec<String>,
) -> Result<(), LegacyError> {
    let caller = authenticated()?;
    router_service::set_legacy_distributions(
        caller,
        get_current_time_ns(),
        legacy_id,
        distributions,
        nick_names,
    )
}

#[update]
fn set_legacy_beneficiaries(req: UpdateBeneficiariesRequest) -> Result<(), LegacyError> {
    let caller = authenticated()?;
    validate_request(&req)?;
    router_service::set_legacy_beneficiaries(
        caller,
        get_current_time_ns(),
        req.legacy_id,
        MultisigMainConfig {
            name: req.name,
            note: req.note,
            nick_names: req.nick_names,
            beneficiaries: req.beneficiaries,
            assets: req.assets,
        },
        req.min_required_signatures,
    )
}

#[update]
fn set_legacy_config(req: UpdateConfigRequest) -> Result<(), LegacyError> {
    let caller = authenticated()?;
    validate_request(&req)?;
    router_service::set_legacy_config(
        caller,
        get_current_time_ns(),
        req.legacy_id,
        req.name,
        req.note,
        req.timing,
    )
}

#[update]
fn keep_alive(legacy_id: LegacyId) -> Result<(), LegacyError> {
    let caller = authenticated()?;
    router_service::keep_alive(caller, get_current_time_ns(), legacy_id)
}

// --- Activation ---

#[update]
async fn claim_legacy(
    legacy_id: LegacyId,
    auth: SignedAuthorization,
) -> Result<ClaimOutcome, LegacyError> {
    let caller = authenticated()?;
    legacy_service::claim(
        caller,
        ic_cdk::id(),
        get_current_time_ns(),
        legacy_id,
        auth,
        &LedgerTokenClient,
        &CanisterWalletClient,
    )
    .await
}

#[update]
async fn sign_activation(
    legacy_id: LegacyId,
    auth: SignedAuthorization,
) -> Result<SignOutcome, LegacyError> {
    let caller = authenticated()?;
    multisig_service::sign_activation(
        caller,
        ic_cdk::id(),
        get_current_time_ns(),
        legacy_id,
        auth,
        &LedgerTokenClient,
    )
    .await
}

// --- Keeper pipeline ---

#[update]
fn register_reminder(req: RegisterReminderRequest) -> Result<(), LegacyError> {
    let caller = authenticated()?;
    validate_request(&req)?;
    automation_service::register_reminder(
        caller,
        ReminderConfig {
            email: req.email,
            time_prior_activation_secs: req.time_prior_activation_secs,
        },
    )
}

#[update]
fn unregister_reminder() -> Result<(), LegacyError> {
    let caller = authenticated()?;
    automation_service::unregister_reminder(caller);
    Ok(())
}

#[update]
fn reset_automation(legacy_id: LegacyId) -> Result<(), LegacyError> {
    let caller = authenticated()?;
    automation_service::reset_automation(caller, legacy_id)
}

/// Scan phase. Pure read; repeating it changes nothing.
#[query]
fn check_pending_actions() -> Result<Vec<PendingAction>, LegacyError> {
    check_keeper(&caller())?;
    Ok(automation_service::check_pending(get_current_time_ns()))
}

#[update]
async fn perform_pending_actions(actions: Vec<PendingAction>) -> Result<u32, LegacyError> {
    check_keeper(&caller())?;
    let mailer = RelayMailClient { relay_url: settings::get_settings().mail_relay_url };
    automation_service::perform_pending(get_current_time_ns(), actions, &mailer).await
}

// --- Admin ---

#[update]
fn configure(new_settings: RouterSettings) -> Result<(), LegacyError> {
    check_admin(&caller())?;
    settings::set_settings(new_settings);
    Ok(())
}

#[update]
fn set_fee(fee_e8s: u64) -> Result<(), LegacyError> {
    check_admin(&caller())?;
    let mut s = settings::get_settings();
    s.fee_e8s = fee_e8s;
    settings::set_settings(s);
    Ok(())
}

#[update]
fn set_fee_receiver(receiver: Principal) -> Result<(), LegacyError> {
    check_admin(&caller())?;
    let mut s = settings::get_settings();
    s.fee_receiver = receiver;
    settings::set_settings(s);
    Ok(())
}

#[update]
fn set_legacy_limit(limit: u32) -> Result<(), LegacyError> {
    check_admin(&caller())?;
    let mut s = settings::get_settings();
    s.legacy_limit = limit;
    settings::set_settings(s);
    Ok(())
}

#[update]
fn set_beneficiary_limit(limit: u32) -> Result<(), LegacyError> {
    check_admin(&caller())?;
    let mut s = settings::get_settings();
    s.beneficiary_limit = limit;
    settings::set_settings(s);
    Ok(())
}

// --- Queries ---

#[query]
fn next_legacy_address() -> Result<Principal, LegacyError> {
    let caller = authenticated()?;
    Ok(router_service::next_legacy_address(&caller))
}

#[query]
fn get_legacy(legacy_id: LegacyId) -> Result<LegacyRecord, LegacyError> {
    router_service::get_legacy(legacy_id)
}

#[query]
fn get_my_legacies() -> Result<Vec<LegacyRecord>, LegacyError> {
    let caller = authenticated()?;
    Ok(router_service::get_legacies_of(&caller))
}

#[query]
fn get_distribution(
    legacy_id: LegacyId,
    asset: AssetId,
    beneficiary: Principal,
) -> Result<Percent, LegacyError> {
    Ok(router_service::get_distribution(legacy_id, &asset, &beneficiary))
}

#[query]
fn get_beneficiaries(legacy_id: LegacyId) -> Result<Vec<(Principal, String)>, LegacyError> {
    router_service::get_beneficiaries(legacy_id)
}

#[query]
fn get_signers(legacy_id: LegacyId) -> Result<Vec<Principal>, LegacyError> {
    Ok(multisig_service::get_signers(legacy_id))
}

/// Current tier and whether the inactivity window has elapsed.
#[query]
fn claim_status(legacy_id: LegacyId) -> Result<(Layer, bool), LegacyError> {
    legacy_service::claim_status(legacy_id, get_current_time_ns())
}

#[query]
fn get_events(legacy_id: LegacyId, limit: u32) -> Result<Vec<LegacyEvent>, LegacyError> {
    Ok(crate::storage::events::get_events_for(legacy_id, limit as usize))
}

#[query]
fn get_router_settings() -> Result<RouterSettings, LegacyError> {
    check_admin(&caller())?;
    Ok(settings::get_settings())
}

// Export Candid interface. Lives here so every endpoint argument and return
// type the macro names is in scope.
ic_cdk::export_candid!();
