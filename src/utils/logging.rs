//! Conditional logging macros gated on a module-level `ENABLE_LOGS` flag.
//!
//! Usage:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//!
//! use crate::{log_info, log_warn};
//!
//! log_info!("activated {} at index {}", item_id, index);
//! ```
//!
//! The feed emits a log line for every viewability batch and every tier
//! advance, which is noisy on long scroll sessions. Modules that sit on the
//! hot path can flip their flag off without touching `RUST_LOG`.

/// Info-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!($($arg)*);
        }
    };
}

/// Debug-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!($($arg)*);
        }
    };
}

/// Warn-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!($($arg)*);
        }
    };
}

/// Error-level log, skipped when the calling module sets `ENABLE_LOGS = false`.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!($($arg)*);
        }
    };
}
