//! Interrupt handling while a foreground server runs.
//!
//! The CLI must outlive Ctrl+C long enough to stop the server and clear its
//! record, so termination signals are captured rather than acted on.

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::info;

use super::LIFECYCLE_TARGET;
use super::error::LifecycleError;

/// Source of "the user asked us to stop" notifications.
pub trait InterruptSignal {
    /// Returns `true` once an interrupt has arrived since the last call.
    fn interrupted(&mut self) -> bool;
}

/// Captures `SIGINT`, `SIGTERM`, and `SIGHUP` until dropped.
pub struct SystemInterrupts {
    signals: Signals,
    handle: Handle,
}

impl SystemInterrupts {
    /// Installs the handlers.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Interrupts`] when registration fails.
    pub fn install() -> Result<Self, LifecycleError> {
        let signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
            .map_err(|source| LifecycleError::Interrupts { source })?;
        let handle = signals.handle();
        Ok(Self { signals, handle })
    }
}

impl InterruptSignal for SystemInterrupts {
    fn interrupted(&mut self) -> bool {
        let received = self.signals.pending().next();
        if let Some(signal) = received {
            info!(target: LIFECYCLE_TARGET, signal, "interrupt received");
        }
        received.is_some()
    }
}

impl Drop for SystemInterrupts {
    fn drop(&mut self) {
        self.handle.close();
    }
}
