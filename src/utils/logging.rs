//! Logging macros gated on a module-level `ENABLE_LOGS` flag, so a noisy
//! module (the capture loop runs every few milliseconds) can be silenced
//! without touching RUST_LOG.
//!
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! use crate::{log_info, log_warn};
//!
//! log_warn!("gesture sample skipped: {reason}");
//! ```

#[doc(hidden)]
#[macro_export]
macro_rules! gated_log {
    ($level:ident, $($arg:tt)*) => {
        if ENABLE_LOGS {
            log::$level!($($arg)*);
        }
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => { $crate::gated_log!(debug, $($arg)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::gated_log!(info, $($arg)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::gated_log!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => { $crate::gated_log!(error, $($arg)*) };
}
