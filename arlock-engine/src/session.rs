//! Tracking-session boundary
//!
//! The world-tracking engine (frame delivery, feature-point reconstruction,
//! hit testing, anchor registration) is an external collaborator behind the
//! `WorldTracking` trait. This module also defines the session fault taxonomy:
//! every fault delivered by the engine is classified Recoverable or Fatal and
//! the pipeline must handle both.

use arlock_common::config::SessionOptions;
use arlock_common::events::SessionFaultKind;
use arlock_common::geometry::{Point2, Pose};
use tracing::info;

use crate::anchor::AnchorId;
use crate::error::Result;

/// Result-type filter for hit testing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitFilter {
    /// Intersect reconstructed feature points only (baseline variant)
    FeaturePoint,
    /// Intersect detected planes
    ExistingPlane,
    /// No filtering
    Any,
}

/// One ray-cast intersection, in the engine's own ranked order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub pose: Pose,
    /// Distance from the camera along the ray, meters
    pub distance: f32,
}

/// External world-tracking engine
///
/// Hit testing and anchor registration operate on the engine's current frame;
/// both are only meaningful from the pipeline's event-loop context.
pub trait WorldTracking: Send + Sync {
    /// Start (or restart) the session with the given options
    fn run(&self, options: &SessionOptions) -> Result<()>;

    /// Pause the session; frame delivery stops until the next `run`
    fn pause(&self);

    /// Ray cast from a normalized screen point through the reconstructed
    /// environment, returning intersections in the engine's ranked order
    fn hit_test(&self, point: Point2, filter: HitFilter) -> Vec<HitResult>;

    /// Register a new anchor at a world pose; the engine assigns its identity
    /// and later acknowledges it (see `PipelineHandle::anchor_bound`)
    fn register_anchor(&self, pose: Pose) -> AnchorId;
}

/// Faults and lifecycle notices delivered by the tracking engine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The session reported a fault
    Fault {
        kind: SessionFaultKind,
        message: String,
    },
    /// Frame delivery was interrupted (app backgrounded, camera taken)
    Interrupted,
    /// The interruption ended
    InterruptionEnded,
}

/// Start the tracking session, logging the effective options
pub fn start_session(tracking: &dyn WorldTracking, options: &SessionOptions) -> Result<()> {
    info!(
        horizontal_planes = options.horizontal_plane_detection,
        statistics = options.show_statistics,
        "Starting tracking session"
    );
    tracking.run(options)
}
