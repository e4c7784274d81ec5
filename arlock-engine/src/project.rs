//! Projector
//!
//! Converts a 2-D screen point into a 3-D world pose by ray casting through
//! the tracking engine's reconstructed environment. The baseline variant
//! intersects feature points only; the engine's own ranking is respected and
//! the first intersection is taken unmodified.
//!
//! Must run on the pipeline's event-loop context: the engine's frame and world
//! data are only valid there.

use arlock_common::geometry::{Point2, Pose};
use tracing::trace;

use crate::session::{HitFilter, WorldTracking};

/// Screen-point to world-pose projection via the tracking engine
pub struct Projector {
    filter: HitFilter,
}

impl Projector {
    /// Feature-point projector, the baseline configuration
    pub fn new() -> Self {
        Self {
            filter: HitFilter::FeaturePoint,
        }
    }

    pub fn with_filter(filter: HitFilter) -> Self {
        Self { filter }
    }

    /// Project a screen point onto the reconstructed environment
    ///
    /// Returns `None` when the ray intersects nothing; absence of a hit is a
    /// per-frame non-event, not an error.
    pub fn project(&self, tracking: &dyn WorldTracking, point: Point2) -> Option<Pose> {
        let hits = tracking.hit_test(point, self.filter);
        let hit = hits.into_iter().next()?;
        trace!(
            x = hit.pose.position.x,
            y = hit.pose.position.y,
            z = hit.pose.position.z,
            "Projection hit"
        );
        Some(hit.pose)
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arlock_common::config::SessionOptions;
    use arlock_common::geometry::Vec3;
    use crate::anchor::AnchorId;
    use crate::session::HitResult;
    use std::sync::Mutex;

    struct FakeTracking {
        hits: Mutex<Vec<HitResult>>,
        seen_filter: Mutex<Option<HitFilter>>,
    }

    impl WorldTracking for FakeTracking {
        fn run(&self, _options: &SessionOptions) -> crate::error::Result<()> {
            Ok(())
        }
        fn pause(&self) {}
        fn hit_test(&self, _point: Point2, filter: HitFilter) -> Vec<HitResult> {
            *self.seen_filter.lock().unwrap() = Some(filter);
            self.hits.lock().unwrap().clone()
        }
        fn register_anchor(&self, _pose: Pose) -> AnchorId {
            uuid::Uuid::new_v4()
        }
    }

    fn hit(z: f32, distance: f32) -> HitResult {
        HitResult {
            pose: Pose::from_position(Vec3::new(0.0, 0.0, z)),
            distance,
        }
    }

    #[test]
    fn takes_first_ranked_hit() {
        let tracking = FakeTracking {
            hits: Mutex::new(vec![hit(-0.5, 0.5), hit(-2.0, 2.0)]),
            seen_filter: Mutex::new(None),
        };
        let pose = Projector::new()
            .project(&tracking, Point2::new(0.5, 0.5))
            .unwrap();
        assert!((pose.position.z + 0.5).abs() < 1e-6);
    }

    #[test]
    fn filters_to_feature_points_by_default() {
        let tracking = FakeTracking {
            hits: Mutex::new(vec![]),
            seen_filter: Mutex::new(None),
        };
        let result = Projector::new().project(&tracking, Point2::new(0.5, 0.5));
        assert!(result.is_none());
        assert_eq!(
            *tracking.seen_filter.lock().unwrap(),
            Some(HitFilter::FeaturePoint)
        );
    }
}
