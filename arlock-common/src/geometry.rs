//! Geometry value types shared between the detection and anchoring layers
//!
//! All image-space coordinates are normalized to [0, 1]. World-space units are
//! meters, matching the tracking engine's convention.

use serde::{Deserialize, Serialize};

/// 2-D point in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle in normalized image coordinates
///
/// `x`/`y` is the min corner, `width`/`height` extend toward positive axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RectNorm {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl RectNorm {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Center point of the rectangle
    pub fn center(&self) -> Point2 {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Rectangle reflected across the horizontal midline of the unit square
    ///
    /// The barcode service reports regions with the vertical axis inverted
    /// relative to screen space (scale y by -1, translate y by +1). The min
    /// corner of the flipped rectangle is `1 - y - height`.
    pub fn flipped_vertical(&self) -> Self {
        Self {
            x: self.x,
            y: 1.0 - self.y - self.height,
            width: self.width,
            height: self.height,
        }
    }
}

/// 3-D vector (world space, meters)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Uniform vector (s, s, s), used for uniform node scaling
    pub fn splat(s: f32) -> Self {
        Self { x: s, y: s, z: s }
    }
}

/// Unit quaternion orientation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// World-space pose (position + orientation)
///
/// Extracted from the tracking engine's 4x4 world transform; the translation
/// column carries the position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }
}

/// RGBA color, components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color {
        r: 1.0,
        g: 1.0,
        b: 1.0,
        a: 1.0,
    };

    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_center() {
        let r = RectNorm::new(0.2, 0.4, 0.2, 0.2);
        let c = r.center();
        assert!((c.x - 0.3).abs() < 1e-6);
        assert!((c.y - 0.5).abs() < 1e-6);
    }

    #[test]
    fn rect_vertical_flip() {
        let r = RectNorm::new(0.1, 0.1, 0.3, 0.2);
        let f = r.flipped_vertical();
        assert!((f.x - 0.1).abs() < 1e-6);
        assert!((f.y - 0.7).abs() < 1e-6);
        assert!((f.width - 0.3).abs() < 1e-6);
        assert!((f.height - 0.2).abs() < 1e-6);
    }

    #[test]
    fn rect_flip_is_involution() {
        let r = RectNorm::new(0.25, 0.6, 0.1, 0.3);
        let back = r.flipped_vertical().flipped_vertical();
        assert!((back.y - r.y).abs() < 1e-6);
    }

    #[test]
    fn flip_preserves_center_x_mirrors_center_y() {
        let r = RectNorm::new(0.3, 0.2, 0.2, 0.1);
        let c = r.center();
        let fc = r.flipped_vertical().center();
        assert!((fc.x - c.x).abs() < 1e-6);
        assert!((fc.y - (1.0 - c.y)).abs() < 1e-6);
    }
}
