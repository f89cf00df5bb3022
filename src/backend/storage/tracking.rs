// src/backend/storage/tracking.rs
use crate::models::common::{LegacyId, PrincipalId};
use crate::models::reminder::{NotificationStage, ReminderConfig, TrackedLegacy};
use crate::storage::memory::{get_reminders_memory, get_tracked_memory, Memory};
use crate::storage::storable::Cbor;
use ic_stable_structures::{StableBTreeMap, StableCell};
use std::cell::RefCell;

type RemindersMap = StableBTreeMap<PrincipalId, Cbor<ReminderConfig>, Memory>;

thread_local! {
    /// Dense list of keeper-tracked legacies. Removal swap-removes, so ids
    /// keep no stable position here.
    static TRACKED: RefCell<StableCell<Cbor<Vec<TrackedLegacy>>, Memory>> = RefCell::new(
        StableCell::init(get_tracked_memory(), Cbor(Vec::new()))
            .expect("Failed to initialize tracked legacies cell")
    );

    /// Per-owner notification preferences.
    static REMINDERS: RefCell<RemindersMap> = RefCell::new(
        RemindersMap::init(get_reminders_memory())
    );
}

pub fn get_tracked() -> Vec<TrackedLegacy> {
    TRACKED.with(|cell| cell.borrow().get().0.clone())
}

fn put_tracked(list: Vec<TrackedLegacy>) {
    TRACKED.with(|cell| {
        cell.borrow_mut()
            .set(Cbor(list))
            .expect("Failed to set tracked legacies");
    });
}

/// Enrolls a legacy in the keeper pipeline. Idempotent.
pub fn track(legacy_id: LegacyId) {
    let mut list = get_tracked();
    if !list.iter().any(|t| t.legacy_id == legacy_id) {
        list.push(TrackedLegacy { legacy_id, last_stage: NotificationStage::None });
        put_tracked(list);
    }
}

/// Drops a legacy from the keeper pipeline by swap-remove.
pub fn untrack(legacy_id: LegacyId) {
    let mut list = get_tracked();
    if let Some(pos) = list.iter().position(|t| t.legacy_id == legacy_id) {
        list.swap_remove(pos);
        put_tracked(list);
    }
}

/// Advances the recorded stage for a tracked legacy. Stages never move
/// backwards through this path.
pub fn set_stage(legacy_id: LegacyId, stage: NotificationStage) {
    let mut list = get_tracked();
    if let Some(entry) = list.iter_mut().find(|t| t.legacy_id == legacy_id) {
        if stage > entry.last_stage {
            entry.last_stage = stage;
            put_tracked(list);
        }
    }
}

/// Rewinds the recorded stage to `None`, used when the owner reconfigures
/// timing and the boundaries all move.
pub fn reset_stage(legacy_id: LegacyId) {
    let mut list = get_tracked();
    if let Some(entry) = list.iter_mut().find(|t| t.legacy_id == legacy_id) {
        entry.last_stage = NotificationStage::None;
        put_tracked(list);
    }
}

pub fn get_reminder(owner: &PrincipalId) -> Option<ReminderConfig> {
    REMINDERS.with(|map_ref| map_ref.borrow().get(owner).map(|c| c.0))
}

pub fn set_reminder(owner: &PrincipalId, config: ReminderConfig) {
    REMINDERS.with(|map_ref| {
        map_ref.borrow_mut().insert(*owner, Cbor(config));
    });
}

pub fn remove_reminder(owner: &PrincipalId) {
    REMINDERS.with(|map_ref| {
        map_ref.borrow_mut().remove(owner);
    });
}
