//! Event types and EventBus for the anchoring pipeline
//!
//! The pipeline is event-driven: every observable state change (anchor
//! registration, pose refresh, content replacement, fetch completion, session
//! faults) is broadcast so that UI layers and tests can observe the pipeline
//! without reaching into its internals.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::geometry::Pose;

/// Severity taxonomy for tracking-session faults
///
/// Recoverable faults are surfaced and logged; the pipeline keeps running.
/// Fatal faults pause the session and halt frame intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionFaultKind {
    Recoverable,
    Fatal,
}

impl std::fmt::Display for SessionFaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFaultKind::Recoverable => write!(f, "recoverable"),
            SessionFaultKind::Fatal => write!(f, "fatal"),
        }
    }
}

/// Why a fetched object was not applied to the scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOutcome {
    /// Bytes applied as content
    Applied,
    /// Transport or decode failure; error fallback content substituted
    Failed,
    /// A newer fetch was issued before this one completed; result dropped
    Stale,
}

/// Pipeline event types
///
/// Events are broadcast via EventBus and can be serialized for transmission
/// to an observing UI layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ArEvent {
    /// A new anchor was registered with the tracking engine
    ///
    /// The visual node does not exist yet; it is built when the engine
    /// acknowledges the anchor (see `AnchorBound`).
    AnchorRegistered {
        anchor_id: Uuid,
        payload: String,
        pose: Pose,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The tracking engine acknowledged the anchor and its node was attached
    AnchorBound {
        anchor_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The anchor's transform was refreshed from a new projection
    PoseRefreshed {
        anchor_id: Uuid,
        pose: Pose,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Content was rebuilt because the decoded payload changed
    ContentReplaced {
        anchor_id: Uuid,
        payload: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A frame produced a detection but projection found no intersection
    ProjectionMissed {
        payload: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A detection round finished without touching the anchor
    ///
    /// Emitted when the detector saw nothing (or errored internally).
    DetectionEmpty {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A remote object fetch was dispatched
    FetchStarted {
        anchor_id: Uuid,
        key: String,
        sequence: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A remote object fetch finished
    FetchFinished {
        anchor_id: Uuid,
        key: String,
        sequence: u64,
        outcome: FetchOutcome,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The tracking session reported a fault
    SessionFault {
        kind: SessionFaultKind,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The tracking session was interrupted (frames are dropped meanwhile)
    SessionInterrupted {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The interruption ended; frame intake resumed
    SessionResumed {
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

// ========================================
// EventBus Implementation
// ========================================

/// Central event distribution bus for pipeline events
///
/// Uses tokio::broadcast internally, providing:
/// - Non-blocking publish (slow subscribers don't block the pipeline)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ArEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given channel capacity
    ///
    /// Old events are dropped for lagging subscribers once the buffer fills.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<ArEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists,
    /// `Err` otherwise. Emission failure is not an error condition for the
    /// pipeline; callers typically `.ok()` the result.
    pub fn emit(&self, event: ArEvent) -> Result<usize, broadcast::error::SendError<ArEvent>> {
        self.tx.send(event)
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
