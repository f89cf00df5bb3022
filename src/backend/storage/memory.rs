// src/backend/storage/memory.rs
use ic_stable_structures::memory_manager::{MemoryId, MemoryManager, VirtualMemory};
use ic_stable_structures::{DefaultMemoryImpl, StableCell};
use std::cell::RefCell;

// Memory IDs for stable structures. Non-overlapping, never reused after a
// release has shipped with them.
const UPGRADES_MEMORY_ID: MemoryId = MemoryId::new(0);
const SETTINGS_MEM_ID: MemoryId = MemoryId::new(1);
const LEGACIES_MEM_ID: MemoryId = MemoryId::new(2);
const LEGACY_SEQ_MEM_ID: MemoryId = MemoryId::new(3);
const OWNER_STATS_MEM_ID: MemoryId = MemoryId::new(4);
const OWNER_INDEX_MEM_ID: MemoryId = MemoryId::new(5);
const DISTRIBUTIONS_MEM_ID: MemoryId = MemoryId::new(6);
const SIGNATURES_MEM_ID: MemoryId = MemoryId::new(7);
const EVENTS_MEM_ID: MemoryId = MemoryId::new(8);
const EVENT_SEQ_MEM_ID: MemoryId = MemoryId::new(9);
const REMINDERS_MEM_ID: MemoryId = MemoryId::new(10);
const TRACKED_MEM_ID: MemoryId = MemoryId::new(11);
// Reserve IDs 12-19 for future use

pub type Memory = VirtualMemory<DefaultMemoryImpl>;

thread_local! {
    static MEMORY_MANAGER: RefCell<MemoryManager<DefaultMemoryImpl>> = RefCell::new(
        MemoryManager::init(DefaultMemoryImpl::default())
    );

    /// Upgrade counter, bumped in post_upgrade.
    pub static UPGRADES: RefCell<StableCell<u64, Memory>> = RefCell::new(
        StableCell::init(MEMORY_MANAGER.with(|m| m.borrow().get(UPGRADES_MEMORY_ID)), 0)
            .expect("Failed to initialize upgrades cell")
    );
}

/// Get memory instance for a specific MemoryId.
pub fn get_memory(id: MemoryId) -> Memory {
    MEMORY_MANAGER.with(|m| m.borrow().get(id))
}

pub fn get_settings_memory() -> Memory {
    get_memory(SETTINGS_MEM_ID)
}

pub fn get_legacies_memory() -> Memory {
    get_memory(LEGACIES_MEM_ID)
}

pub fn get_legacy_seq_memory() -> Memory {
    get_memory(LEGACY_SEQ_MEM_ID)
}

pub fn get_owner_stats_memory() -> Memory {
    get_memory(OWNER_STATS_MEM_ID)
}

pub fn get_owner_index_memory() -> Memory {
    get_memory(OWNER_INDEX_MEM_ID)
}

pub fn get_distributions_memory() -> Memory {
    get_memory(DISTRIBUTIONS_MEM_ID)
}

pub fn get_signatures_memory() -> Memory {
    get_memory(SIGNATURES_MEM_ID)
}

pub fn get_events_memory() -> Memory {
    get_memory(EVENTS_MEM_ID)
}

pub fn get_event_seq_memory() -> Memory {
    get_memory(EVENT_SEQ_MEM_ID)
}

pub fn get_reminders_memory() -> Memory {
    get_memory(REMINDERS_MEM_ID)
}

pub fn get_tracked_memory() -> Memory {
    get_memory(TRACKED_MEM_ID)
}
