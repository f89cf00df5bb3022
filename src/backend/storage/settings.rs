// src/backend/storage/settings.rs
use crate::storage::memory::{get_settings_memory, Memory};
use crate::storage::storable::Cbor;
use candid::{CandidType, Principal};
use ic_stable_structures::StableCell;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

/// Router-level settings, owned by the admin. One CBOR cell; every field is
/// replaceable by `configure` without a canister upgrade.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RouterSettings {
    pub admin: Principal,
    /// Principal allowed to drive the keeper pipeline besides the admin.
    pub keeper: Principal,
    /// Creation fee in native e8s. Zero disables fee collection.
    pub fee_e8s: u64,
    pub fee_receiver: Principal,
    /// Max live legacies per owner.
    pub legacy_limit: u32,
    /// Max distinct beneficiaries per legacy.
    pub beneficiary_limit: u32,
    /// Freshness window for creation authorization signatures, in seconds.
    pub max_signature_age_secs: u64,
    /// Domain separation constant mixed into beneficiary authorization
    /// digests. Set once at install; distinct per deployment.
    pub domain_id: u64,
    /// The native token ledger canister.
    pub native_ledger: Principal,
    /// Mail relay HTTP endpoint for keeper notifications.
    pub mail_relay_url: String,
    /// Policy module a custodied wallet must have enabled.
    pub custody_module: Principal,
}

impl Default for RouterSettings {
    fn default() -> Self {
        RouterSettings {
            admin: Principal::management_canister(),
            keeper: Principal::management_canister(),
            fee_e8s: 0,
            fee_receiver: Principal::management_canister(),
            legacy_limit: 10,
            beneficiary_limit: 10,
            max_signature_age_secs: 3_600,
            domain_id: 0,
            native_ledger: Principal::management_canister(),
            mail_relay_url: String::new(),
            custody_module: Principal::management_canister(),
        }
    }
}

thread_local! {
    static SETTINGS: RefCell<StableCell<Cbor<RouterSettings>, Memory>> = RefCell::new(
        StableCell::init(get_settings_memory(), Cbor(RouterSettings::default()))
            .expect("Failed to initialize settings stable cell")
    );
}

/// Replace the whole settings record. Called from init and from the admin
/// `configure` endpoint.
pub fn set_settings(settings: RouterSettings) {
    SETTINGS.with(|cell| {
        cell.borrow_mut()
            .set(Cbor(settings))
            .expect("Failed to set router settings");
    });
}

pub fn get_settings() -> RouterSettings {
    SETTINGS.with(|cell| cell.borrow().get().0.clone())
}
