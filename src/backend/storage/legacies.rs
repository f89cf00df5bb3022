// src/backend/storage/legacies.rs
use crate::models::common::{LegacyId, PrincipalId};
use crate::models::legacy_record::LegacyRecord;
use crate::storage::memory::{
    get_legacies_memory, get_legacy_seq_memory, get_owner_index_memory, get_owner_stats_memory,
    Memory,
};
use crate::storage::storable::Cbor;
use candid::CandidType;
use ic_stable_structures::{StableBTreeMap, StableCell};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;

type LegaciesMap = StableBTreeMap<LegacyId, Cbor<LegacyRecord>, Memory>;
type OwnerStatsMap = StableBTreeMap<PrincipalId, Cbor<OwnerStats>, Memory>;
type OwnerIndexMap = StableBTreeMap<PrincipalId, Cbor<Vec<LegacyId>>, Memory>;

/// Per-owner counters. `nonce` only ever grows (it feeds deterministic
/// address derivation); `count` tracks live legacies against the limit and
/// drops on deletion.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct OwnerStats {
    pub nonce: u64,
    pub count: u32,
}

thread_local! {
    /// All legacies, live and terminal, keyed by sequential id.
    static LEGACIES: RefCell<LegaciesMap> = RefCell::new(
        LegaciesMap::init(get_legacies_memory())
    );

    /// Next legacy id to assign.
    static LEGACY_SEQ: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(get_legacy_seq_memory(), 1)
            .expect("Failed to initialize legacy id cell")
    );

    static OWNER_STATS: RefCell<OwnerStatsMap> = RefCell::new(
        OwnerStatsMap::init(get_owner_stats_memory())
    );

    /// Owner -> ids index, so per-owner queries never scan the whole map.
    static OWNER_INDEX: RefCell<OwnerIndexMap> = RefCell::new(
        OwnerIndexMap::init(get_owner_index_memory())
    );
}

/// Claims the next sequential legacy id.
pub fn next_legacy_id() -> u64 {
    LEGACY_SEQ.with(|cell| {
        let id = *cell.borrow().get();
        cell.borrow_mut()
            .set(id + 1)
            .expect("Failed to advance legacy id cell");
        id
    })
}

pub fn insert_legacy(record: &LegacyRecord) -> Option<LegacyRecord> {
    let previous = LEGACIES.with(|map_ref| {
        map_ref
            .borrow_mut()
            .insert(record.id, Cbor(record.clone()))
            .map(|prev| prev.0)
    });
    if previous.is_none() {
        OWNER_INDEX.with(|map_ref| {
            let mut map = map_ref.borrow_mut();
            let mut ids = map.get(&record.owner).map(|c| c.0).unwrap_or_default();
            ids.push(record.id);
            map.insert(record.owner, Cbor(ids));
        });
    }
    previous
}

pub fn get_legacy(id: LegacyId) -> Option<LegacyRecord> {
    LEGACIES.with(|map_ref| map_ref.borrow().get(&id).map(|cbor| cbor.0))
}

pub fn legacy_ids_of(owner: &PrincipalId) -> Vec<LegacyId> {
    OWNER_INDEX.with(|map_ref| map_ref.borrow().get(owner).map(|c| c.0).unwrap_or_default())
}

pub fn get_owner_stats(owner: &PrincipalId) -> OwnerStats {
    OWNER_STATS.with(|map_ref| {
        map_ref
            .borrow()
            .get(owner)
            .map(|cbor| cbor.0)
            .unwrap_or_default()
    })
}

pub fn set_owner_stats(owner: &PrincipalId, stats: OwnerStats) {
    OWNER_STATS.with(|map_ref| {
        map_ref.borrow_mut().insert(*owner, Cbor(stats));
    });
}
