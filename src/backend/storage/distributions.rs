// src/backend/storage/distributions.rs
use crate::models::common::LegacyId;
use crate::models::distribution::DistributionLedger;
use crate::storage::memory::{get_distributions_memory, Memory};
use crate::storage::storable::Cbor;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type DistributionsMap = StableBTreeMap<LegacyId, Cbor<DistributionLedger>, Memory>;

thread_local! {
    /// One whole ledger per legacy, written back as a unit after each
    /// validated submission.
    static DISTRIBUTIONS: RefCell<DistributionsMap> = RefCell::new(
        DistributionsMap::init(get_distributions_memory())
    );
}

pub fn get_ledger(id: LegacyId) -> DistributionLedger {
    DISTRIBUTIONS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&id)
            .map(|cbor| cbor.0)
            .unwrap_or_default()
    })
}

pub fn put_ledger(id: LegacyId, ledger: &DistributionLedger) {
    DISTRIBUTIONS.with(|map_ref| {
        map_ref.borrow_mut().insert(id, Cbor(ledger.clone()));
    });
}

pub fn remove_ledger(id: LegacyId) -> Option<DistributionLedger> {
    DISTRIBUTIONS.with(|map_ref| map_ref.borrow_mut().remove(&id).map(|cbor| cbor.0))
}
