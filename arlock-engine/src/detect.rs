//! Detector adapter
//!
//! Wraps the external barcode-recognition service behind a trait seam. The
//! adapter configures a symbology allow-list (QR only for this app), selects
//! the first ranked observation deterministically, and flips the reported
//! bounding region vertically so downstream projection receives screen-space
//! coordinates.
//!
//! Absence of a detection is not a failure: detector errors and empty result
//! sets both map to `None`.

use arlock_common::geometry::RectNorm;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::error::Result;

/// Symbology families the external detector can be asked to recognize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbology {
    Qr,
    Aztec,
    Code128,
    DataMatrix,
}

/// A captured camera image handed to the detector
///
/// Pixel data is shared so the image can move into the background detection
/// task without copying the buffer.
#[derive(Debug, Clone)]
pub struct FrameImage {
    pub width: u32,
    pub height: u32,
    pub data: Arc<Vec<u8>>,
}

impl FrameImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data: Arc::new(data),
        }
    }
}

/// One ranked observation from the external detector
///
/// `region` is in the detector's native coordinate space (vertical axis
/// inverted relative to screen space); the adapter flips it before use.
#[derive(Debug, Clone)]
pub struct Observation {
    pub payload: String,
    pub region: RectNorm,
}

/// External barcode-recognition service
///
/// Implementations run the actual recognition request. Observations are
/// returned in the service's own ranked order; the adapter does not re-rank.
pub trait BarcodeDetector: Send + Sync {
    fn observe(&self, image: &FrameImage, allow: &[Symbology]) -> Result<Vec<Observation>>;
}

/// Per-frame detection outcome
///
/// Immutable value produced per processed frame and discarded after use.
/// `region` is in screen-space coordinates (already flipped).
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub payload: String,
    pub region: RectNorm,
}

/// Adapter configuring and interpreting the external detector
pub struct DetectorAdapter {
    detector: Arc<dyn BarcodeDetector>,
    allow: Vec<Symbology>,
}

impl DetectorAdapter {
    /// QR-only adapter, the configuration used by this app
    pub fn qr_only(detector: Arc<dyn BarcodeDetector>) -> Self {
        Self {
            detector,
            allow: vec![Symbology::Qr],
        }
    }

    /// Adapter with an explicit symbology allow-list
    pub fn with_symbologies(detector: Arc<dyn BarcodeDetector>, allow: Vec<Symbology>) -> Self {
        Self { detector, allow }
    }

    /// Run one detection round against a frame image
    ///
    /// Returns the first ranked observation with its region flipped into
    /// screen space, or `None` on empty results or detector error.
    pub fn detect(&self, image: &FrameImage) -> Option<DetectionResult> {
        let observations = match self.detector.observe(image, &self.allow) {
            Ok(obs) => obs,
            Err(e) => {
                debug!("Detector error treated as no detection: {}", e);
                return None;
            }
        };

        let first = observations.into_iter().next()?;
        trace!(payload = %first.payload, "Detection hit");

        Some(DetectionResult {
            payload: first.payload,
            region: first.region.flipped_vertical(),
        })
    }

    pub fn symbologies(&self) -> &[Symbology] {
        &self.allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Scripted {
        observations: Vec<Observation>,
        fail: bool,
    }

    impl BarcodeDetector for Scripted {
        fn observe(&self, _image: &FrameImage, allow: &[Symbology]) -> Result<Vec<Observation>> {
            assert_eq!(allow, &[Symbology::Qr]);
            if self.fail {
                return Err(crate::error::Error::Detector("internal".into()));
            }
            Ok(self.observations.clone())
        }
    }

    fn frame() -> FrameImage {
        FrameImage::new(640, 480, vec![0; 16])
    }

    fn obs(payload: &str, y: f32) -> Observation {
        Observation {
            payload: payload.to_string(),
            region: RectNorm::new(0.4, y, 0.2, 0.2),
        }
    }

    #[test]
    fn first_observation_wins() {
        let adapter = DetectorAdapter::qr_only(Arc::new(Scripted {
            observations: vec![obs("first", 0.1), obs("second", 0.5)],
            fail: false,
        }));
        let result = adapter.detect(&frame()).unwrap();
        assert_eq!(result.payload, "first");
    }

    #[test]
    fn region_is_flipped_vertically() {
        let adapter = DetectorAdapter::qr_only(Arc::new(Scripted {
            observations: vec![obs("a", 0.1)],
            fail: false,
        }));
        let result = adapter.detect(&frame()).unwrap();
        // y' = 1 - 0.1 - 0.2
        assert!((result.region.y - 0.7).abs() < 1e-6);
        assert!((result.region.x - 0.4).abs() < 1e-6);
    }

    #[test]
    fn empty_results_yield_none() {
        let adapter = DetectorAdapter::qr_only(Arc::new(Scripted {
            observations: vec![],
            fail: false,
        }));
        assert!(adapter.detect(&frame()).is_none());
    }

    #[test]
    fn detector_error_yields_none() {
        let adapter = DetectorAdapter::qr_only(Arc::new(Scripted {
            observations: vec![],
            fail: true,
        }));
        assert!(adapter.detect(&frame()).is_none());
    }
}
