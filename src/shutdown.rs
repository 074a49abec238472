use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

const NOT_TRIGGERED: u8 = 0;

/// Why playback is stopping. Ordered by severity: an interrupt escalates an
/// end-of-stream stop, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ShutdownCause {
    EndOfStream = 1,
    Interrupt = 2,
}

impl ShutdownCause {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::EndOfStream),
            2 => Some(Self::Interrupt),
            _ => None,
        }
    }
}

/// Shared stop flag handed to every worker at spawn time. Once set it is never cleared.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    state: Arc<AtomicU8>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true only for the call that first set the signal.
    pub fn trigger(&self, cause: ShutdownCause) -> bool {
        self.state.fetch_max(cause as u8, Ordering::SeqCst) == NOT_TRIGGERED
    }

    pub fn is_triggered(&self) -> bool {
        self.state.load(Ordering::SeqCst) != NOT_TRIGGERED
    }

    pub fn is_interrupted(&self) -> bool {
        self.cause() == Some(ShutdownCause::Interrupt)
    }

    pub fn cause(&self) -> Option<ShutdownCause> {
        ShutdownCause::from_raw(self.state.load(Ordering::SeqCst))
    }

    /// Routes Ctrl-C into the signal instead of killing the process. Process-wide; call once.
    pub fn install_interrupt_handler(&self) -> Result<()> {
        let signal = self.clone();
        ctrlc::set_handler(move || {
            if signal.trigger(ShutdownCause::Interrupt) {
                tracing::info!("interrupt received, stopping playback");
            }
        })
        .context("failed to register Ctrl-C handler")
    }
}
