// src/backend/utils/logger.rs
// Debug-print logging that works both on-canister and in native tests.

/// INFO-level log line. Goes to the replica debug log on wasm, stdout
/// elsewhere.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {{
        #[cfg(target_family = "wasm")]
        ic_cdk::println!($($arg)*);
        #[cfg(not(target_family = "wasm"))]
        println!($($arg)*);
    }};
}

/// WARN/ERROR-level log line.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {{
        #[cfg(target_family = "wasm")]
        ic_cdk::eprintln!($($arg)*);
        #[cfg(not(target_family = "wasm"))]
        eprintln!($($arg)*);
    }};
}
