// src/backend/models/reminder.rs
use crate::models::common::{LegacyId, LegacyKind, TimestampNs, NANOS_PER_SEC};
use crate::models::legacy_record::LegacyRecord;
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// Per-owner notification preferences for the keeper pipeline.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct ReminderConfig {
    pub email: String,
    /// Lead time for the `Before*` warning stages, in seconds.
    pub time_prior_activation_secs: u64,
}

/// Notification milestones in strictly increasing order. The keeper only
/// ever moves a legacy forward through these; re-observing the same stage
/// is a no-op, which is what makes `perform_pending` idempotent.
#[derive(
    CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Copy,
)]
pub enum NotificationStage {
    None,
    BeforeLayer1,
    Layer1Ready,
    BeforeLayer2,
    Layer2Ready,
    BeforeLayer3,
    Layer3Ready,
}

impl NotificationStage {
    /// Highest stage whose boundary has passed at `now`, given the owner's
    /// configured lead time. Boundaries that collapse together (lead longer
    /// than a tier delay) simply skip intermediate stages.
    pub fn due(record: &LegacyRecord, lead_secs: u64, now_ns: TimestampNs) -> NotificationStage {
        let lead_ns = lead_secs.saturating_mul(NANOS_PER_SEC);
        // (boundary, stage) pairs in ascending stage order.
        let mut stages: Vec<(TimestampNs, NotificationStage)> = vec![
            (record.layer1_at_ns().saturating_sub(lead_ns), NotificationStage::BeforeLayer1),
            (record.layer1_at_ns(), NotificationStage::Layer1Ready),
        ];
        if record.kind != LegacyKind::Multisig {
            stages.push((
                record.layer2_at_ns().saturating_sub(lead_ns),
                NotificationStage::BeforeLayer2,
            ));
            stages.push((record.layer2_at_ns(), NotificationStage::Layer2Ready));
            stages.push((
                record.layer3_at_ns().saturating_sub(lead_ns),
                NotificationStage::BeforeLayer3,
            ));
            stages.push((record.layer3_at_ns(), NotificationStage::Layer3Ready));
        }

        stages
            .into_iter()
            .filter(|(boundary, _)| now_ns >= *boundary)
            .map(|(_, stage)| stage)
            .max()
            .unwrap_or(NotificationStage::None)
    }
}

/// Keeper bookkeeping for one tracked legacy.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TrackedLegacy {
    pub legacy_id: LegacyId,
    pub last_stage: NotificationStage,
}

/// One crossed boundary surfaced by `check_pending` and consumed by
/// `perform_pending`.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct PendingAction {
    pub legacy_id: LegacyId,
    pub stage: NotificationStage,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::LegacyStatus;
    use crate::models::legacy_config::TimingConfig;
    use candid::Principal;

    fn record(kind: LegacyKind) -> LegacyRecord {
        LegacyRecord {
            id: 7,
            address: Principal::from_slice(&[9; 8]),
            owner: Principal::from_slice(&[1; 8]),
            kind,
            status: LegacyStatus::Active,
            name: "estate".into(),
            note: String::new(),
            timing: TimingConfig {
                inactivity_window_secs: 1_000,
                delay_layer2_secs: 1_000,
                delay_layer3_secs: 1_000,
            },
            min_required_signatures: 0,
            roster: None,
            custody_wallet: None,
            fallback_layer2: None,
            fallback_layer3: None,
            last_activity_ns: 10_000 * NANOS_PER_SEC,
            escrowed_native: 0,
            created_at_ns: 10_000 * NANOS_PER_SEC,
            updated_at_ns: 10_000 * NANOS_PER_SEC,
        }
    }

    fn at_secs(s: u64) -> TimestampNs {
        s * NANOS_PER_SEC
    }

    #[test]
    fn stages_are_strictly_ordered() {
        use NotificationStage::*;
        let order = [None, BeforeLayer1, Layer1Ready, BeforeLayer2, Layer2Ready, BeforeLayer3, Layer3Ready];
        for pair in order.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn due_walks_every_boundary_with_lead() {
        let r = record(LegacyKind::DirectTransfer);
        let lead = 100;
        use NotificationStage::*;
        assert_eq!(NotificationStage::due(&r, lead, at_secs(10_899)), None);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(10_900)), BeforeLayer1);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(11_000)), Layer1Ready);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(11_900)), BeforeLayer2);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(12_000)), Layer2Ready);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(12_900)), BeforeLayer3);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(13_000)), Layer3Ready);
        assert_eq!(NotificationStage::due(&r, lead, at_secs(50_000)), Layer3Ready);
    }

    #[test]
    fn extreme_lead_saturates_and_fires_every_warning_at_once() {
        let r = record(LegacyKind::DirectTransfer);
        // Warning boundaries all clamp to zero; the last of them wins.
        assert_eq!(
            NotificationStage::due(&r, u64::MAX, at_secs(0)),
            NotificationStage::BeforeLayer3
        );
    }

    #[test]
    fn oversized_lead_skips_intermediate_stages() {
        let r = record(LegacyKind::DirectTransfer);
        // Lead longer than a full tier delay: the layer 2 warning boundary
        // (10_500) lands before Layer1Ready (11_000), so the highest due
        // stage jumps straight past Layer1Ready.
        assert_eq!(
            NotificationStage::due(&r, 1_500, at_secs(10_500)),
            NotificationStage::BeforeLayer2
        );
        assert_eq!(
            NotificationStage::due(&r, 1_500, at_secs(11_000)),
            NotificationStage::BeforeLayer2
        );
        // Layer2Ready (12_000) is outranked once the layer 3 warning
        // boundary (11_500) has passed.
        assert_eq!(
            NotificationStage::due(&r, 1_500, at_secs(12_000)),
            NotificationStage::BeforeLayer3
        );
    }

    #[test]
    fn multisig_only_has_the_first_two_stages() {
        let r = record(LegacyKind::Multisig);
        assert_eq!(
            NotificationStage::due(&r, 100, at_secs(99_999)),
            NotificationStage::Layer1Ready
        );
    }
}
