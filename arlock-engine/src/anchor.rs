//! Anchor store
//!
//! Holds at most one (anchor identity, last-seen payload) pair and decides, per
//! successful projection, whether to register a new anchor or refresh the
//! existing one. The pose is overwritten unconditionally on every refresh
//! (tracking refinement); content is rebuilt only when the decoded payload
//! differs from the last rendered one, which is the de-duplication key that
//! prevents redundant rebuilds and network fetches every frame.
//!
//! Creation is two-phase: the anchor is registered with the tracking engine
//! first, and the visual node is built only once the engine acknowledges the
//! anchor (`bind`). Building the node at registration time would race the
//! engine assigning the anchor its session-tracked identity.
//!
//! There is no transition back to `Empty`: single-anchor apps in this lineage
//! never remove the anchor.

use arlock_common::geometry::Pose;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Opaque anchor identity assigned by the tracking engine
pub type AnchorId = Uuid;

/// Externally observable store state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorStatus {
    /// No anchor yet
    Empty,
    /// Anchor registered, engine acknowledgment pending
    Registered,
    /// Anchor acknowledged and node attached
    Anchored,
}

/// What the pipeline should do with a successful projection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// No anchor exists: register one with the tracking engine
    Register,
    /// Anchor registered but not yet acknowledged; latest payload and pose
    /// were recorded and will be used when the engine binds the anchor
    Deferred,
    /// Anchor exists: pose was overwritten; rebuild content iff it changed
    Refresh { content_changed: bool },
}

#[derive(Debug)]
enum State {
    Empty,
    Registered {
        id: AnchorId,
        payload: String,
        pose: Pose,
    },
    Anchored {
        id: AnchorId,
        payload: String,
        pose: Pose,
    },
}

/// Single-anchor lifecycle state machine
#[derive(Debug)]
pub struct AnchorStore {
    state: State,
}

impl AnchorStore {
    pub fn new() -> Self {
        Self { state: State::Empty }
    }

    pub fn status(&self) -> AnchorStatus {
        match self.state {
            State::Empty => AnchorStatus::Empty,
            State::Registered { .. } => AnchorStatus::Registered,
            State::Anchored { .. } => AnchorStatus::Anchored,
        }
    }

    /// Identity of the current anchor, if one exists
    pub fn anchor_id(&self) -> Option<AnchorId> {
        match &self.state {
            State::Empty => None,
            State::Registered { id, .. } | State::Anchored { id, .. } => Some(*id),
        }
    }

    /// Last payload recorded for content (the de-duplication key)
    pub fn last_payload(&self) -> Option<&str> {
        match &self.state {
            State::Empty => None,
            State::Registered { payload, .. } | State::Anchored { payload, .. } => {
                Some(payload.as_str())
            }
        }
    }

    /// Latest recorded pose
    pub fn pose(&self) -> Option<Pose> {
        match &self.state {
            State::Empty => None,
            State::Registered { pose, .. } | State::Anchored { pose, .. } => Some(*pose),
        }
    }

    /// Consult the store with a successful projection
    ///
    /// Pure decision plus state update; registration itself is the caller's
    /// side effect (see `registered`).
    pub fn observe(&mut self, payload: &str, new_pose: Pose) -> Disposition {
        match &mut self.state {
            State::Empty => Disposition::Register,
            State::Registered {
                payload: stored,
                pose,
                ..
            } => {
                // Acknowledgment still pending: remember the latest detection
                // so the bind builds current content at the current pose.
                if stored != payload {
                    *stored = payload.to_string();
                }
                *pose = new_pose;
                Disposition::Deferred
            }
            State::Anchored {
                payload: stored,
                pose,
                ..
            } => {
                *pose = new_pose;
                let content_changed = stored != payload;
                if content_changed {
                    debug!(from = %stored, to = %payload, "Payload changed, content rebuild due");
                    *stored = payload.to_string();
                }
                Disposition::Refresh { content_changed }
            }
        }
    }

    /// Record a completed registration (Empty → Registered)
    pub fn registered(&mut self, id: AnchorId, payload: String, pose: Pose) -> Result<()> {
        match self.state {
            State::Empty => {
                info!(%id, %payload, "Anchor registered, awaiting engine acknowledgment");
                self.state = State::Registered { id, payload, pose };
                Ok(())
            }
            _ => Err(Error::InvalidState(
                "anchor already registered".to_string(),
            )),
        }
    }

    /// Engine acknowledged the anchor (Registered → Anchored)
    ///
    /// Returns the payload the node should be built from.
    pub fn bind(&mut self, id: AnchorId) -> Result<String> {
        match &self.state {
            State::Registered {
                id: stored_id,
                payload,
                pose,
            } if *stored_id == id => {
                let payload = payload.clone();
                let pose = *pose;
                info!(%id, "Anchor bound");
                self.state = State::Anchored {
                    id,
                    payload: payload.clone(),
                    pose,
                };
                Ok(payload)
            }
            State::Registered { id: stored_id, .. } => Err(Error::InvalidState(format!(
                "bind for unknown anchor {} (expected {})",
                id, stored_id
            ))),
            _ => Err(Error::InvalidState(format!(
                "bind for anchor {} in state {:?}",
                id,
                self.status()
            ))),
        }
    }
}

impl Default for AnchorStore {
    fn default() -> Self {
        Self::new()
    }
}
