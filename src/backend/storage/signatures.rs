// src/backend/storage/signatures.rs
use crate::models::common::{LegacyId, PrincipalId};
use crate::storage::memory::{get_signatures_memory, Memory};
use crate::storage::storable::Cbor;
use ic_stable_structures::StableBTreeMap;
use std::cell::RefCell;

type SignersMap = StableBTreeMap<LegacyId, Cbor<Vec<PrincipalId>>, Memory>;

thread_local! {
    /// Distinct collected signers per multisig legacy, in collection order.
    static SIGNERS: RefCell<SignersMap> = RefCell::new(
        SignersMap::init(get_signatures_memory())
    );
}

/// Records a signer if not already present. Returns the distinct signer
/// count after the call, so the caller can compare against the quorum.
pub fn add_signer(id: LegacyId, signer: PrincipalId) -> u32 {
    SIGNERS.with(|map_ref| {
        let mut map = map_ref.borrow_mut();
        let mut signers = map.get(&id).map(|c| c.0).unwrap_or_default();
        if !signers.contains(&signer) {
            signers.push(signer);
        }
        let count = signers.len() as u32;
        map.insert(id, Cbor(signers));
        count
    })
}

pub fn get_signers(id: LegacyId) -> Vec<PrincipalId> {
    SIGNERS.with(|map_ref| map_ref.borrow().get(&id).map(|c| c.0).unwrap_or_default())
}

pub fn has_signed(id: LegacyId, signer: &PrincipalId) -> bool {
    SIGNERS.with(|map_ref| {
        map_ref
            .borrow()
            .get(&id)
            .map(|c| c.0.contains(signer))
            .unwrap_or(false)
    })
}

pub fn remove_signers(id: LegacyId) {
    SIGNERS.with(|map_ref| {
        map_ref.borrow_mut().remove(&id);
    });
}
