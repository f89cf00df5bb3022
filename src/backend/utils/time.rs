// src/backend/utils/time.rs
use crate::models::common::{TimestampNs, NANOS_PER_SEC};

/// Returns the current Internet Computer time as nanoseconds since epoch.
pub fn get_current_time_ns() -> TimestampNs {
    ic_cdk::api::time()
}

/// Truncates a nanosecond timestamp to whole unix seconds.
pub fn ns_to_secs(ns: TimestampNs) -> u64 {
    ns / NANOS_PER_SEC
}
