//! Detection gate
//!
//! Serializes detection work against the incoming frame stream: at most one
//! detection round-trip may be outstanding at any instant. Frames arriving
//! while the gate is held are dropped, not queued.
//!
//! Exposed as try-acquire / release so the at-most-one invariant is testable
//! in isolation. Release happens in `GatePermit::drop`, so every code path out
//! of a detection round (success, empty, error, panic unwind) releases exactly
//! once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Single-slot admission gate for detection dispatch
#[derive(Debug, Clone)]
pub struct DetectionGate {
    busy: Arc<AtomicBool>,
}

/// Held while a detection round-trip is outstanding
///
/// Dropping the permit releases the gate. The permit is Send so it can travel
/// into the background detection task and back with the completion message.
#[derive(Debug)]
pub struct GatePermit {
    busy: Arc<AtomicBool>,
}

impl DetectionGate {
    pub fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attempt to acquire the gate
    ///
    /// Returns `None` if a detection is already outstanding; the caller drops
    /// the frame in that case.
    pub fn try_acquire(&self) -> Option<GatePermit> {
        match self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Some(GatePermit {
                busy: Arc::clone(&self.busy),
            }),
            Err(_) => {
                trace!("Detection gate busy, frame dropped");
                None
            }
        }
    }

    /// Whether a detection round-trip is currently outstanding
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

impl Default for DetectionGate {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
