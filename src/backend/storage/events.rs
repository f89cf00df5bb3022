// src/backend/storage/events.rs
use crate::models::common::{LegacyId, PrincipalId, TimestampNs};
use crate::models::event::{EventKind, LegacyEvent};
use crate::storage::memory::{get_event_seq_memory, get_events_memory, Memory};
use crate::storage::storable::Cbor;
use ic_stable_structures::{StableBTreeMap, StableCell};
use std::cell::RefCell;

type EventsMap = StableBTreeMap<u64, Cbor<LegacyEvent>, Memory>;

thread_local! {
    /// Append-only event log keyed by sequence number.
    static EVENTS: RefCell<EventsMap> = RefCell::new(
        EventsMap::init(get_events_memory())
    );

    static EVENT_SEQ: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(get_event_seq_memory(), 0)
            .expect("Failed to initialize event sequence cell")
    );
}

/// Appends one event and returns its sequence number.
pub fn add_event(
    legacy_id: LegacyId,
    actor: PrincipalId,
    at_ns: TimestampNs,
    kind: EventKind,
) -> u64 {
    let id = EVENT_SEQ.with(|cell| {
        let id = *cell.borrow().get();
        cell.borrow_mut()
            .set(id + 1)
            .expect("Failed to advance event sequence cell");
        id
    });
    let event = LegacyEvent { id, legacy_id, actor, at_ns, kind };
    EVENTS.with(|map_ref| {
        map_ref.borrow_mut().insert(id, Cbor(event));
    });
    id
}

/// Events for one legacy, oldest first, capped at `limit`. The whole log is
/// scanned; acceptable at audit volumes, revisit with a per-legacy index if
/// that changes.
pub fn get_events_for(legacy_id: LegacyId, limit: usize) -> Vec<LegacyEvent> {
    EVENTS.with(|map_ref| {
        map_ref
            .borrow()
            .iter()
            .map(|(_, cbor)| cbor.0)
            .filter(|e| e.legacy_id == legacy_id)
            .take(limit)
            .collect()
    })
}
