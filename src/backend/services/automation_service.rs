// src/backend/services/automation_service.rs
// Two-phase keeper pipeline: a cheap scan surfacing crossed notification
// boundaries, and a performer that sends reminders and advances stages.

use crate::{
    adapter::MailClient,
    error::LegacyError,
    models::{
        common::*,
        event::EventKind,
        reminder::{NotificationStage, PendingAction, ReminderConfig},
    },
    storage,
};

/// Stores the caller's notification preferences.
pub fn register_reminder(caller: PrincipalId, config: ReminderConfig) -> Result<(), LegacyError> {
    if config.email.is_empty() {
        return Err(LegacyError::InvalidInput("email must not be empty".to_string()));
    }
    storage::tracking::set_reminder(&caller, config);
    Ok(())
}

pub fn unregister_reminder(caller: PrincipalId) {
    storage::tracking::remove_reminder(&caller);
}

/// Owner-only rewind of the keeper stage for one legacy, so a reconfigured
/// schedule re-fires earlier notifications.
pub fn reset_automation(caller: PrincipalId, id: LegacyId) -> Result<(), LegacyError> {
    let record = storage::legacies::get_legacy(id).ok_or(LegacyError::LegacyNotFound(id))?;
    if record.owner != caller {
        return Err(LegacyError::OnlyOwner);
    }
    storage::tracking::reset_stage(id);
    Ok(())
}

fn lead_secs_for(owner: &PrincipalId) -> u64 {
    storage::tracking::get_reminder(owner)
        .map(|r| r.time_prior_activation_secs)
        .unwrap_or(0)
}

/// Scan phase. Pure read over the tracked list, reporting every legacy
/// whose due stage is ahead of its recorded one. Back-to-back scans at the
/// same instant return the same actions; only a perform call consumes them.
pub fn check_pending(now: TimestampNs) -> Vec<PendingAction> {
    let mut pending = Vec::new();
    for entry in storage::tracking::get_tracked() {
        let record = match storage::legacies::get_legacy(entry.legacy_id) {
            Some(r) if r.is_active() => r,
            // Terminal or missing records are cleaned up by the performer.
            _ => continue,
        };
        let due = NotificationStage::due(&record, lead_secs_for(&record.owner), now);
        if due > entry.last_stage {
            pending.push(PendingAction { legacy_id: entry.legacy_id, stage: due });
        }
    }
    pending
}

fn stage_subject(stage: NotificationStage) -> &'static str {
    match stage {
        NotificationStage::None => "",
        NotificationStage::BeforeLayer1 => "Your legacy unlocks soon",
        NotificationStage::Layer1Ready => "Your legacy is claimable",
        NotificationStage::BeforeLayer2 => "Your legacy escalates to its first fallback soon",
        NotificationStage::Layer2Ready => "Your legacy reached its first fallback tier",
        NotificationStage::BeforeLayer3 => "Your legacy escalates to its final fallback soon",
        NotificationStage::Layer3Ready => "Your legacy reached its final fallback tier",
    }
}

/// Perform phase. Re-validates every reported action against current state,
/// sends the owner's reminder mail, advances the recorded stage and logs an
/// event. Re-performing an already-consumed action is a no-op, which makes
/// retries safe. Errors with `NothingPending` when no action survived
/// re-validation.
pub async fn perform_pending<M: MailClient>(
    now: TimestampNs,
    actions: Vec<PendingAction>,
    mailer: &M,
) -> Result<u32, LegacyError> {
    let mut performed = 0u32;

    for action in actions {
        let tracked = storage::tracking::get_tracked();
        let entry = match tracked.iter().find(|t| t.legacy_id == action.legacy_id) {
            Some(e) => e.clone(),
            None => continue,
        };
        let record = match storage::legacies::get_legacy(action.legacy_id) {
            Some(r) if r.is_active() => r,
            _ => {
                storage::tracking::untrack(action.legacy_id);
                continue;
            }
        };

        // The boundary must still be crossed and still be news.
        if action.stage <= entry.last_stage {
            continue;
        }
        let due = NotificationStage::due(&record, lead_secs_for(&record.owner), now);
        if due < action.stage {
            // Owner activity moved the boundaries since the scan.
            continue;
        }

        if let Some(reminder) = storage::tracking::get_reminder(&record.owner) {
            let body = format!(
                "Legacy \"{}\" ({}) reached stage {:?}.",
                record.name, record.address, action.stage
            );
            if let Err(e) = mailer
                .send(&reminder.email, stage_subject(action.stage), &body)
                .await
            {
                // Delivery problems never block the stage transition.
                crate::log_warn!(
                    "⏰ KEEPER: Reminder for legacy {} failed: {}",
                    action.legacy_id, e
                );
            }
        }

        storage::tracking::set_stage(action.legacy_id, action.stage);
        storage::events::add_event(
            action.legacy_id,
            record.owner,
            now,
            EventKind::ReminderSent { stage: action.stage },
        );
        performed += 1;
    }

    if performed == 0 {
        return Err(LegacyError::NothingPending);
    }
    crate::log_info!("⏰ KEEPER: Performed {} notification actions", performed);
    Ok(performed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::mock::MockMailer;
    use crate::models::legacy_config::{Distribution, LegacyMainConfig, TimingConfig};
    use crate::services::router_service::{self, CreateLegacyArgs};
    use crate::storage::settings::{set_settings, RouterSettings};
    use crate::utils::crypto::{self, test_support::TestSigner};
    use candid::Principal;
    use futures::executor::block_on;

    const DAY: u64 = 86_400;

    fn engine() -> Principal {
        Principal::from_slice(&[0xEE; 8])
    }

    fn at_secs(s: u64) -> TimestampNs {
        s * NANOS_PER_SEC
    }

    fn token(id: u8) -> AssetId {
        AssetId::Token(Principal::from_slice(&[id; 10]))
    }

    fn create_tracked(owner: &TestSigner) -> LegacyId {
        let bene = TestSigner::new(20);
        let predicted = router_service::next_legacy_address(&owner.principal);
        let args = CreateLegacyArgs {
            kind: LegacyKind::DirectTransfer,
            main: LegacyMainConfig {
                name: "estate".into(),
                note: String::new(),
                nick_names: vec!["B".into()],
                distributions: vec![Distribution {
                    beneficiary: bene.principal,
                    assets: vec![token(1)],
                    percents: vec![100],
                }],
            },
            timing: TimingConfig {
                inactivity_window_secs: DAY,
                delay_layer2_secs: DAY,
                delay_layer3_secs: DAY,
            },
            fallback_layer2: None,
            fallback_layer3: None,
            custody_wallet: None,
            timestamp_secs: 0,
            auth: owner.sign(
                crypto::creation_message(&predicted, 0).as_bytes(),
            ),
        };
        let bank = crate::adapter::mock::MockBank::default();
        let wallet = crate::adapter::mock::MockWallet::default();
        block_on(router_service::create_legacy(
            owner.principal,
            engine(),
            0,
            args,
            &bank,
            &wallet,
        ))
        .unwrap()
        .id
    }

    fn setup() -> (TestSigner, LegacyId) {
        set_settings(RouterSettings { domain_id: 42, ..RouterSettings::default() });
        let owner = TestSigner::new(1);
        let id = create_tracked(&owner);
        register_reminder(
            owner.principal,
            ReminderConfig {
                email: "owner@example.com".into(),
                time_prior_activation_secs: 3_600,
            },
        )
        .unwrap();
        (owner, id)
    }

    #[test]
    fn nothing_pending_before_the_first_boundary() {
        let (_owner, _id) = setup();
        assert!(check_pending(at_secs(DAY - 3_601)).is_empty());
    }

    #[test]
    fn stages_fire_in_order_and_perform_is_idempotent() {
        let (_owner, id) = setup();
        let mailer = MockMailer::default();

        // Lead boundary crossed.
        let pending = check_pending(at_secs(DAY - 3_600));
        assert_eq!(
            pending,
            vec![PendingAction { legacy_id: id, stage: NotificationStage::BeforeLayer1 }]
        );
        assert_eq!(
            block_on(perform_pending(at_secs(DAY - 3_600), pending.clone(), &mailer)),
            Ok(1)
        );
        assert_eq!(mailer.sent.borrow().len(), 1);

        // Same boundary again: consumed, nothing pending.
        assert!(check_pending(at_secs(DAY - 3_600)).is_empty());
        assert_eq!(
            block_on(perform_pending(at_secs(DAY - 3_600), pending, &mailer)),
            Err(LegacyError::NothingPending)
        );
        assert_eq!(mailer.sent.borrow().len(), 1);

        // Later boundaries surface one after another.
        let pending = check_pending(at_secs(DAY));
        assert_eq!(pending[0].stage, NotificationStage::Layer1Ready);
        block_on(perform_pending(at_secs(DAY), pending, &mailer)).unwrap();

        let pending = check_pending(at_secs(3 * DAY));
        assert_eq!(pending[0].stage, NotificationStage::Layer3Ready);
        block_on(perform_pending(at_secs(3 * DAY), pending, &mailer)).unwrap();
        assert_eq!(mailer.sent.borrow().len(), 3);
    }

    #[test]
    fn owner_activity_invalidates_scanned_actions() {
        let (owner, id) = setup();
        let mailer = MockMailer::default();

        let pending = check_pending(at_secs(DAY));
        assert_eq!(pending.len(), 1);

        // Owner proves liveness between scan and perform.
        router_service::keep_alive(owner.principal, at_secs(DAY), id).unwrap();
        assert_eq!(
            block_on(perform_pending(at_secs(DAY), pending, &mailer)),
            Err(LegacyError::NothingPending)
        );
        assert!(mailer.sent.borrow().is_empty());
    }

    #[test]
    fn stage_reset_refires_after_reconfiguration() {
        let (owner, id) = setup();
        let mailer = MockMailer::default();

        let pending = check_pending(at_secs(DAY));
        block_on(perform_pending(at_secs(DAY), pending, &mailer)).unwrap();

        // keep_alive rewinds both the clock and the recorded stage.
        router_service::keep_alive(owner.principal, at_secs(DAY + 10), id).unwrap();
        assert!(check_pending(at_secs(DAY + 20)).is_empty());
        let pending = check_pending(at_secs(2 * DAY + 10));
        assert_eq!(pending[0].stage, NotificationStage::Layer1Ready);
    }

    #[test]
    fn terminal_legacies_are_untracked_by_the_performer() {
        let (owner, id) = setup();
        let mailer = MockMailer::default();
        let bank = crate::adapter::mock::MockBank::default();

        let pending = check_pending(at_secs(DAY));
        block_on(router_service::delete_legacy(owner.principal, at_secs(DAY), id, &bank)).unwrap();
        // Deletion already untracked it; perform just skips.
        assert_eq!(
            block_on(perform_pending(at_secs(DAY), pending, &mailer)),
            Err(LegacyError::NothingPending)
        );
        assert!(storage::tracking::get_tracked().is_empty());
    }

    #[test]
    fn back_to_back_scans_see_everything_and_agree() {
        set_settings(RouterSettings { domain_id: 42, ..RouterSettings::default() });
        let owner = TestSigner::new(1);
        let a = create_tracked(&owner);
        let b = create_tracked(&owner);
        let c = create_tracked(&owner);

        // One scan covers the whole tracked list, and scanning changes
        // nothing: repeating it returns the identical actions.
        let first = check_pending(at_secs(DAY));
        let second = check_pending(at_secs(DAY));
        assert_eq!(first, second);

        let mut seen: Vec<LegacyId> = first.iter().map(|p| p.legacy_id).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![a, b, c]);
    }
}
