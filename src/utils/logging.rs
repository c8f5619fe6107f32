//! Conditional logging macros gated by module-level constants.
//!
//! Usage:
//! ```ignore
//! // In your module, define both constants first:
//! const ENABLE_LOGS: bool = true;
//! const LOG_TAG: &str = "[Music]";
//!
//! // Then use the macros (they're exported at the crate root):
//! use crate::{log_info, log_warn, log_error};
//!
//! log_info!("restored play head to {:.2}s", 125.4);
//! ```
//!
//! Every line is prefixed with `LOG_TAG` so wizard and playback output can be
//! told apart in one `RUST_LOG` stream.

/// Conditional debug logging.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("{} {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Conditional info logging.
///
/// Each module that uses this macro must define:
/// ```ignore
/// const ENABLE_LOGS: bool = true; // or false
/// const LOG_TAG: &str = "[Tag]";
/// ```
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("{} {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Conditional warn logging. Same requirements as [`log_info!`].
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("{} {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Conditional error logging. Same requirements as [`log_info!`].
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!("{} {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}
