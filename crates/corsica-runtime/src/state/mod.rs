//! Persistent runtime state shared by every CLI invocation.
//!
//! The state document records the running server (if any) and the installed
//! plugins. Reads without the lock are permitted for reporting; every
//! read-modify-write goes through a [`StateGuard`], which holds the advisory
//! lock for its lifetime and persists changes atomically on
//! [`StateGuard::commit`].

use std::time::{Duration, SystemTime, UNIX_EPOCH};

mod error;
mod files;
mod lock;
mod records;
mod store;

pub use error::StateError;
pub use records::{PluginRecord, RuntimeState, ServerProcessRecord};
pub use store::{StateGuard, StateStore};

pub(crate) const STATE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::state");

/// Budget for acquiring the state lock while another invocation holds it.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(30);

/// Seconds since the Unix epoch, saturating to zero on a clock set before it.
#[must_use]
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}

/// Renders a Unix timestamp as RFC 3339, falling back to the raw seconds.
#[must_use]
pub fn format_timestamp(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|secs| time::OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|instant| {
            instant
                .format(&time::format_description::well_known::Rfc3339)
                .ok()
        })
        .unwrap_or_else(|| seconds.to_string())
}
