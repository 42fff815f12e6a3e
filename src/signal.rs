//! Ctrl+C handling for `commitwatch watch`.
//!
//! The handler only flips a flag; the watch loop checks it between passes
//! and while sleeping, so a pass that is already running finishes its
//! current directory before the process exits.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{CommitwatchError, Result};

const SLEEP_SLICE: Duration = Duration::from_millis(200);

/// Shutdown flag set by SIGINT. Clones share the flag.
#[derive(Clone)]
pub struct SignalHandler {
    shutdown_flag: Arc<AtomicBool>,
}

impl SignalHandler {
    /// Register the SIGINT handler.
    ///
    /// `ctrlc` allows one handler per process, so this fails if called twice.
    pub fn new() -> Result<Self> {
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&shutdown_flag);

        ctrlc::set_handler(move || {
            flag_clone.store(true, Ordering::SeqCst);
        })
        .map_err(|e| CommitwatchError::SignalHandler(e.to_string()))?;

        Ok(Self { shutdown_flag })
    }

    /// A handler that is never triggered by a signal, for driving loops in tests.
    pub fn detached() -> Self {
        Self {
            shutdown_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag.load(Ordering::SeqCst)
    }

    /// Request shutdown as if SIGINT had arrived.
    pub fn request_shutdown(&self) {
        self.shutdown_flag.store(true, Ordering::SeqCst);
    }

    /// Sleep for `duration`, waking early on shutdown.
    ///
    /// Returns `false` if shutdown was requested.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_shutdown_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
