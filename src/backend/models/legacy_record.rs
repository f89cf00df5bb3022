// src/backend/models/legacy_record.rs
use crate::models::common::{
    Layer, LegacyId, LegacyKind, LegacyStatus, PrincipalId, TimestampNs, NANOS_PER_SEC,
};
use crate::models::legacy_config::{FallbackDistribution, MultisigRoster, TimingConfig};
use candid::CandidType;
use serde::{Deserialize, Serialize};

/// One stored legacy. The distribution ledger lives in its own map keyed by
/// the same id; this record carries identity, lifecycle, timing and escrow.
#[derive(CandidType, Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct LegacyRecord {
    pub id: LegacyId,
    /// Deterministic principal this legacy is addressed by, derived from
    /// `(owner, nonce)` before creation so the consent signature covers it.
    pub address: PrincipalId,
    pub owner: PrincipalId,
    pub kind: LegacyKind,
    pub status: LegacyStatus,
    pub name: String,
    pub note: String,
    pub timing: TimingConfig,
    /// Multisig quorum size. Zero for the time-escalating kinds.
    pub min_required_signatures: u32,
    /// Multisig membership. `None` for the time-escalating kinds.
    pub roster: Option<MultisigRoster>,
    /// The policy-checked wallet assets are pulled from. Custodied kind only.
    pub custody_wallet: Option<PrincipalId>,
    pub fallback_layer2: Option<FallbackDistribution>,
    pub fallback_layer3: Option<FallbackDistribution>,
    /// Reset on every owner interaction; all escalation clocks run from here.
    pub last_activity_ns: TimestampNs,
    /// Native tokens held by the engine on this legacy's behalf (e8s).
    pub escrowed_native: u64,
    pub created_at_ns: TimestampNs,
    pub updated_at_ns: TimestampNs,
}

impl LegacyRecord {
    pub fn is_active(&self) -> bool {
        self.status == LegacyStatus::Active
    }

    /// Owner touched the legacy; all escalation clocks restart.
    pub fn touch(&mut self, now_ns: TimestampNs) {
        self.last_activity_ns = now_ns;
        self.updated_at_ns = now_ns;
    }

    /// When layer 1 beneficiaries become eligible. Saturating: an extreme
    /// window clamps to the end of time instead of wrapping around into the
    /// past and unlocking immediately.
    pub fn layer1_at_ns(&self) -> TimestampNs {
        self.last_activity_ns
            .saturating_add(self.timing.inactivity_window_secs.saturating_mul(NANOS_PER_SEC))
    }

    /// When the layer 2 fallback unlocks.
    pub fn layer2_at_ns(&self) -> TimestampNs {
        self.layer1_at_ns()
            .saturating_add(self.timing.delay_layer2_secs.saturating_mul(NANOS_PER_SEC))
    }

    /// When the layer 3 fallback unlocks.
    pub fn layer3_at_ns(&self) -> TimestampNs {
        self.layer2_at_ns()
            .saturating_add(self.timing.delay_layer3_secs.saturating_mul(NANOS_PER_SEC))
    }

    /// Highest tier unlocked at `now`. Recomputed on demand, never stored,
    /// so a `touch` rewinds escalation implicitly.
    pub fn current_layer(&self, now_ns: TimestampNs) -> Layer {
        if now_ns >= self.layer3_at_ns() {
            Layer::Layer3
        } else if now_ns >= self.layer2_at_ns() {
            Layer::Layer2
        } else {
            Layer::Layer1
        }
    }

    /// Whether any claim at all is possible yet: the inactivity window has
    /// fully elapsed since the owner's last interaction. For the multisig
    /// kind this gates signature collection instead.
    pub fn window_elapsed(&self, now_ns: TimestampNs) -> bool {
        now_ns >= self.layer1_at_ns()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candid::Principal;

    fn record(window: u64, delay2: u64, delay3: u64) -> LegacyRecord {
        LegacyRecord {
            id: 1,
            address: Principal::from_slice(&[9; 8]),
            owner: Principal::from_slice(&[1; 8]),
            kind: LegacyKind::DirectTransfer,
            status: LegacyStatus::Active,
            name: "estate".into(),
            note: String::new(),
            timing: TimingConfig {
                inactivity_window_secs: window,
                delay_layer2_secs: delay2,
                delay_layer3_secs: delay3,
            },
            min_required_signatures: 0,
            roster: None,
            custody_wallet: None,
            fallback_layer2: None,
            fallback_layer3: None,
            last_activity_ns: 1_000 * NANOS_PER_SEC,
            escrowed_native: 0,
            created_at_ns: 1_000 * NANOS_PER_SEC,
            updated_at_ns: 1_000 * NANOS_PER_SEC,
        }
    }

    fn at_secs(s: u64) -> TimestampNs {
        s * NANOS_PER_SEC
    }

    #[test]
    fn one_day_per_tier_escalation() {
        let day = 86_400;
        let r = record(day, day, day);

        assert_eq!(r.current_layer(at_secs(1_000)), Layer::Layer1);
        assert!(!r.window_elapsed(at_secs(1_000 + day - 1)));
        assert!(r.window_elapsed(at_secs(1_000 + day)));
        assert_eq!(r.current_layer(at_secs(1_000 + day)), Layer::Layer1);
        assert_eq!(r.current_layer(at_secs(1_000 + 2 * day - 1)), Layer::Layer1);
        assert_eq!(r.current_layer(at_secs(1_000 + 2 * day)), Layer::Layer2);
        assert_eq!(r.current_layer(at_secs(1_000 + 3 * day - 1)), Layer::Layer2);
        assert_eq!(r.current_layer(at_secs(1_000 + 3 * day)), Layer::Layer3);
    }

    #[test]
    fn layer_is_monotonic_in_time_between_touches() {
        let r = record(100, 50, 50);
        let mut last = Layer::Layer1;
        for s in (1_000..1_400).step_by(7) {
            let layer = r.current_layer(at_secs(s));
            assert!(layer >= last);
            last = layer;
        }
    }

    #[test]
    fn touch_rewinds_escalation() {
        let mut r = record(100, 50, 50);
        assert_eq!(r.current_layer(at_secs(1_300)), Layer::Layer3);
        r.touch(at_secs(1_300));
        assert_eq!(r.current_layer(at_secs(1_300)), Layer::Layer1);
        assert!(!r.window_elapsed(at_secs(1_300)));
    }

    #[test]
    fn extreme_windows_clamp_instead_of_wrapping() {
        let r = record(u64::MAX / 2, u64::MAX / 2, u64::MAX / 2);

        assert_eq!(r.layer1_at_ns(), u64::MAX);
        assert_eq!(r.layer3_at_ns(), u64::MAX);
        assert_eq!(r.current_layer(at_secs(u64::MAX / NANOS_PER_SEC)), Layer::Layer1);
        assert!(!r.window_elapsed(at_secs(2_000)));
    }
}
