// src/backend/services/multisig_service.rs
// Quorum collection and the equal-split claim for the multisig kind.

use crate::{
    adapter::TokenClient,
    error::LegacyError,
    models::{common::*, event::EventKind, legacy_config::MultisigRoster},
    services::legacy_service::PayoutRecord,
    storage,
    storage::settings::get_settings,
    utils::crypto::{self, SignedAuthorization},
};
use candid::CandidType;
use serde::Deserialize;

/// Progress of a multisig activation after one signature call.
#[derive(CandidType, Deserialize, Clone, Debug)]
pub struct SignOutcome {
    pub collected: u32,
    pub required: u32,
    /// Set when this call reached the quorum and ran the claim.
    pub activated: bool,
    pub transfers: Vec<PayoutRecord>,
}

/// Records one beneficiary signature. Signature collection opens only once
/// the inactivity window has elapsed; duplicate signers count once. The
/// call that reaches the quorum executes the claim itself.
pub async fn sign_activation<T: TokenClient>(
    caller: PrincipalId,
    engine: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    auth: SignedAuthorization,
    tokens: &T,
) -> Result<SignOutcome, LegacyError> {
    let mut record = storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))?;
    if record.kind != LegacyKind::Multisig {
        return Err(LegacyError::InvalidInput(
            "only multisig legacies collect signatures".to_string(),
        ));
    }
    if !record.is_active() {
        return Err(LegacyError::LegacyNotActive);
    }
    if !record.window_elapsed(now) {
        return Err(LegacyError::NotEligibleYet);
    }

    let roster = record
        .roster
        .clone()
        .ok_or_else(|| LegacyError::InternalError("multisig record without roster".to_string()))?;
    if !roster.beneficiaries.contains(&caller) {
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

    let already_signed = storage::signatures::has_signed(id, &caller);
    let collected = storage::signatures::add_signer(id, caller);
    if !already_signed {
        storage::events::add_event(id, caller, now, EventKind::SignatureAdded { signer: caller });
    }
    let required = record.min_required_signatures;
    crate::log_info!(
        "✍️ MULTISIG: Legacy {} has {}/{} signatures",
        id, collected, required
    );

    if collected < required {
        return Ok(SignOutcome { collected, required, activated: false, transfers: Vec::new() });
    }

    // Quorum reached: terminal before the first transfer awaits.
    record.status = LegacyStatus::Activated;
    record.updated_at_ns = now;
    let escrow = record.escrowed_native;
    record.escrowed_native = 0;
    storage::legacies::insert_legacy(&record);
    storage::tracking::untrack(id);
    storage::events::add_event(id, caller, now, EventKind::Activated { layer: None });

    let transfers = distribute_equal(&record.owner, engine, now, id, escrow, &roster, tokens).await;
    Ok(SignOutcome { collected, required, activated: true, transfers })
}

/// Splits every roster asset equally among all beneficiaries, floor
/// division. Token bases are bounded by both the owner's balance and the
/// allowance granted to the engine.
async fn distribute_equal<T: TokenClient>(
    owner: &PrincipalId,
    engine: PrincipalId,
    now: TimestampNs,
    id: LegacyId,
    escrow: u64,
    roster: &MultisigRoster,
    tokens: &T,
) -> Vec<PayoutRecord> {
    let heads = roster.beneficiaries.len() as u128;
    let mut assets = roster.assets.clone();
    if escrow > 0 && !assets.contains(&AssetId::Native) {
        assets.push(AssetId::Native);
    }

    let mut transfers = Vec::new();
    for asset in assets {
        let base = match &asset {
            AssetId::Native => escrow as u128,
            token => {
                let balance = tokens.balance_of(token, owner).await.unwrap_or(0);
                let allowance = tokens.allowance(token, owner, &engine).await.unwrap_or(0);
                balance.min(allowance)
            }
        };
        let share = base / heads;
        if share == 0 {
            continue;
        }

        if !asset.is_native() {
            let total = share * heads;
            if let Err(e) = tokens.transfer_from(&asset, owner, &engine, total).await {
                crate::log_warn!("✍️ MULTISIG: Pull of {} for legacy {} failed: {}", asset, id, e);
                continue;
            }
        }

        for beneficiary in &roster.beneficiaries {
            match tokens.transfer(&asset, beneficiary, share).await {
                Ok(()) => {
                    storage::events::add_event(
                        id,
                        *beneficiary,
                        now,
                        EventKind::Transferred {
                            asset: asset.clone(),
                            beneficiary: *beneficiary,
                            amount: share,
                        },
                    );
                    transfers.push(PayoutRecord {
                        asset: asset.clone(),
                        beneficiary: *beneficiary,
                        amount: share,
                    });
                }
                Err(e) => {
                    crate::log_warn!(
                        "✍️ MULTISIG: Payout of {} {} to {} failed: {}",
                        share, asset, beneficiary, e
                    );
                }
            }
        }
    }
    transfers
}

/// Who has signed so far.
pub fn get_signers(id: LegacyId) -> Vec<PrincipalId> {
    storage::signatures::get_signers(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockBank;
    use crate::models::legacy_config::{MultisigConfig, MultisigMainConfig};
    use crate::services::router_service::{self, CreateMultisigArgs};
    use crate::storage::settings::{get_settings, set_settings, RouterSettings};
    use crate::utils::crypto::test_support::TestSigner;
    use candid::Principal;
    use futures::executor::block_on;

    const DAY: u64 = 86_400;

    fn engine() -> Principal {
        Principal::from_slice(&[0xEE; 8])
    }

    fn token(id: u8) -> AssetId {
        AssetId::Token(Principal::from_slice(&[id; 10]))
    }

    fn at_secs(s: u64) -> TimestampNs {
        s * NANOS_PER_SEC
    }

    fn auth_for(signer: &TestSigner, id: LegacyId, owner: &Principal) -> SignedAuthorization {
        let digest = crypto::beneficiary_activation_digest(
            get_settings().domain_id,
            LegacyKind::Multisig.router_kind(),
            id,
            owner,
            &signer.principal,
        );
        signer.sign(&digest)
    }

    struct Fixture {
        owner: TestSigner,
        signers: Vec<TestSigner>,
        bank: MockBank,
        id: LegacyId,
    }

    /// Three beneficiaries, quorum of two, one token funded with 1000.
    fn setup() -> Fixture {
        set_settings(RouterSettings { domain_id: 42, ..RouterSettings::default() });
        let owner = TestSigner::new(1);
        let signers = vec![TestSigner::new(2), TestSigner::new(3), TestSigner::new(4)];
        let bank = MockBank::default();

        let predicted = router_service::next_legacy_address(&owner.principal);
        let args = CreateMultisigArgs {
            main: MultisigMainConfig {
                name: "family".into(),
                note: String::new(),
                nick_names: vec!["A".into(), "B".into(), "C".into()],
                beneficiaries: signers.iter().map(|s| s.principal).collect(),
                assets: vec![token(1)],
            },
            config: MultisigConfig {
                min_required_signatures: 2,
                inactivity_window_secs: DAY,
            },
            timestamp_secs: 0,
            auth: owner.sign(crypto::creation_message(&predicted, 0).as_bytes()),
        };
        let record =
            block_on(router_service::create_multisig_legacy(owner.principal, 0, args, &bank))
                .unwrap();
        bank.set_balance(token(1), owner.principal, 1_000);
        bank.set_allowance(token(1), owner.principal, engine(), 1_000);

        Fixture { owner, signers, bank, id: record.id }
    }

    #[test]
    fn collection_gated_by_inactivity_window() {
        let fx = setup();
        let auth = auth_for(&fx.signers[0], fx.id, &fx.owner.principal);
        assert_eq!(
            block_on(sign_activation(
                fx.signers[0].principal,
                engine(),
                at_secs(DAY - 1),
                fx.id,
                auth,
                &fx.bank,
            ))
            .unwrap_err(),
            LegacyError::NotEligibleYet
        );
    }

    #[test]
    fn quorum_reaching_call_claims_with_equal_split() {
        let fx = setup();
        let first = block_on(sign_activation(
            fx.signers[0].principal,
            engine(),
            at_secs(DAY),
            fx.id,
            auth_for(&fx.signers[0], fx.id, &fx.owner.principal),
            &fx.bank,
        ))
        .unwrap();
        assert_eq!((first.collected, first.required, first.activated), (1, 2, false));
        assert_eq!(fx.bank.balance(&token(1), &fx.signers[0].principal), 0);

        let second = block_on(sign_activation(
            fx.signers[1].principal,
            engine(),
            at_secs(DAY + 5),
            fx.id,
            auth_for(&fx.signers[1], fx.id, &fx.owner.principal),
            &fx.bank,
        ))
        .unwrap();
        assert!(second.activated);
        // 1000 / 3 = 333 each, dust of 1 stays with the owner.
        for signer in &fx.signers {
            assert_eq!(fx.bank.balance(&token(1), &signer.principal), 333);
        }
        assert_eq!(fx.bank.balance(&token(1), &fx.owner.principal), 1);

        // Third signature arrives late: the record is terminal.
        assert_eq!(
            block_on(sign_activation(
                fx.signers[2].principal,
                engine(),
                at_secs(DAY + 9),
                fx.id,
                auth_for(&fx.signers[2], fx.id, &fx.owner.principal),
                &fx.bank,
            ))
            .unwrap_err(),
            LegacyError::LegacyNotActive
        );
    }

    #[test]
    fn duplicate_signer_counts_once() {
        let fx = setup();
        for _ in 0..2 {
            let outcome = block_on(sign_activation(
                fx.signers[0].principal,
                engine(),
                at_secs(DAY),
                fx.id,
                auth_for(&fx.signers[0], fx.id, &fx.owner.principal),
                &fx.bank,
            ))
            .unwrap();
            assert_eq!(outcome.collected, 1);
            assert!(!outcome.activated);
        }
        assert_eq!(get_signers(fx.id), vec![fx.signers[0].principal]);
    }

    #[test]
    fn non_roster_signer_and_cross_variant_signature_rejected() {
        let fx = setup();
        let stranger = TestSigner::new(9);
        assert_eq!(
            block_on(sign_activation(
                stranger.principal,
                engine(),
                at_secs(DAY),
                fx.id,
                auth_for(&stranger, fx.id, &fx.owner.principal),
                &fx.bank,
            ))
            .unwrap_err(),
            LegacyError::NotBeneficiary
        );

        // Signature made with the direct-transfer router constant.
        let digest = crypto::beneficiary_activation_digest(
            get_settings().domain_id,
            LegacyKind::DirectTransfer.router_kind(),
            fx.id,
            &fx.owner.principal,
            &fx.signers[0].principal,
        );
        let cross = fx.signers[0].sign(&digest);
        assert_eq!(
            block_on(sign_activation(
                fx.signers[0].principal,
                engine(),
                at_secs(DAY),
                fx.id,
                cross,
                &fx.bank,
            ))
            .unwrap_err(),
            LegacyError::SignatureInvalid
        );
    }

    #[test]
    fn roster_update_discards_collected_signatures() {
        let fx = setup();
        block_on(sign_activation(
            fx.signers[0].principal,
            engine(),
            at_secs(DAY),
            fx.id,
            auth_for(&fx.signers[0], fx.id, &fx.owner.principal),
            &fx.bank,
        ))
        .unwrap();
        assert_eq!(get_signers(fx.id).len(), 1);

        router_service::set_legacy_beneficiaries(
            fx.owner.principal,
            at_secs(DAY + 1),
            fx.id,
            MultisigMainConfig {
                name: "family".into(),
                note: String::new(),
                nick_names: vec!["A".into(), "B".into()],
                beneficiaries: vec![fx.signers[0].principal, fx.signers[1].principal],
                assets: vec![token(1)],
            },
            2,
        )
        .unwrap();
        assert!(get_signers(fx.id).is_empty());
    }
}
