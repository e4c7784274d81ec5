//! Content builder
//!
//! Pure construction of renderable node trees from a decoded payload and the
//! configured style: a text label on a backing plane, an embedded 3-D asset
//! reference, or an image plane built from fetched bytes. Every builder
//! applies a billboard constraint so content faces the viewer, and a per-kind
//! uniform scale constant for real-world sizing.
//!
//! Image planes preserve aspect ratio against a fixed (width, height) budget:
//! landscape images (ratio > 1) fill the width budget, everything else fills
//! the height budget.

use arlock_common::config::ContentStyle;
use arlock_common::geometry::{Color, Vec3};
use std::sync::Arc;
use tracing::debug;

use crate::error::{Error, Result};

/// Name of the replaceable content node inside an anchor's node tree
///
/// Content refresh swaps the subtree with this name rather than recreating
/// the anchor or its root node.
pub const CONTENT_NODE_NAME: &str = "arlock-content";

/// Surface appearance of a geometry
#[derive(Debug, Clone, PartialEq)]
pub enum Material {
    Color(Color),
    /// Raw encoded image bytes (shared; fetched once, referenced by the node)
    Image(Arc<Vec<u8>>),
    /// Bundled asset looked up by name by the rendering layer
    NamedAsset(String),
}

/// Renderable geometry kinds the rendering engine understands
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Plane {
        width: f32,
        height: f32,
        material: Material,
    },
    Text {
        string: String,
        extrusion: f32,
        material: Material,
    },
    /// Embedded 3-D asset referenced by name
    ModelRef { asset: String },
}

/// Axes a billboard constraint rotates around
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillboardAxes {
    Y,
    All,
}

/// Node constraints applied by the rendering engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Billboard { axes: BillboardAxes },
}

/// One node in a renderable tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: Option<String>,
    pub geometry: Option<Geometry>,
    pub position: Vec3,
    pub scale: Vec3,
    pub constraints: Vec<Constraint>,
    pub children: Vec<Node>,
}

impl Node {
    fn empty() -> Self {
        Self {
            name: None,
            geometry: None,
            position: Vec3::ZERO,
            scale: Vec3::splat(1.0),
            constraints: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Depth-first lookup of a named node
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name.as_deref() == Some(name) {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Replace the subtree with the given name; returns true if found
    pub fn replace(&mut self, name: &str, replacement: Node) -> bool {
        if self.name.as_deref() == Some(name) {
            *self = replacement;
            return true;
        }
        self.children
            .iter_mut()
            .any(|c| c.replace(name, replacement.clone()))
    }
}

/// Text label on a backing plane
///
/// The backing plane carries the billboard constraint; the label is a child
/// scaled down to real-world text size.
pub fn build_text(payload: &str, style: &ContentStyle) -> Node {
    let label = Node {
        geometry: Some(Geometry::Text {
            string: payload.to_string(),
            extrusion: 1.0,
            material: Material::Color(style.text_color),
        }),
        scale: Vec3::splat(style.text_scale),
        ..Node::empty()
    };

    Node {
        name: Some(CONTENT_NODE_NAME.to_string()),
        geometry: Some(Geometry::Plane {
            width: style.backing_width,
            height: style.backing_height,
            material: Material::Color(style.backing_color),
        }),
        constraints: vec![Constraint::Billboard {
            axes: BillboardAxes::Y,
        }],
        children: vec![label],
        ..Node::empty()
    }
}

/// Embedded 3-D asset referenced by the payload
pub fn build_model(asset: &str, style: &ContentStyle) -> Node {
    Node {
        name: Some(CONTENT_NODE_NAME.to_string()),
        geometry: Some(Geometry::ModelRef {
            asset: asset.to_string(),
        }),
        scale: Vec3::splat(style.model_scale),
        constraints: vec![Constraint::Billboard {
            axes: BillboardAxes::Y,
        }],
        ..Node::empty()
    }
}

/// Image plane size for a source image, in meters
///
/// Landscape (ratio > 1): width takes the full width budget, height follows
/// the ratio. Portrait and square (ratio <= 1): height takes the full height
/// budget, width follows the ratio.
pub fn image_plane_size(width: u32, height: u32, style: &ContentStyle) -> (f32, f32) {
    let ratio = width as f32 / height as f32;
    let (budget_w, budget_h) = style.image_budget;
    let s = style.image_scale;
    if ratio > 1.0 {
        (budget_w * s, budget_w * s / ratio)
    } else {
        (budget_h * s * ratio, budget_h * s)
    }
}

/// Image plane built from fetched encoded bytes
///
/// Probes the image header for dimensions; undecodable bytes are a content
/// error (the pipeline substitutes the error asset).
pub fn build_image(bytes: Vec<u8>, style: &ContentStyle) -> Result<Node> {
    let (width, height) = probe_dimensions(&bytes)?;
    let (plane_w, plane_h) = image_plane_size(width, height, style);
    debug!(width, height, plane_w, plane_h, "Building image plane");

    Ok(Node {
        name: Some(CONTENT_NODE_NAME.to_string()),
        geometry: Some(Geometry::Plane {
            width: plane_w,
            height: plane_h,
            material: Material::Image(Arc::new(bytes)),
        }),
        constraints: vec![Constraint::Billboard {
            axes: BillboardAxes::Y,
        }],
        ..Node::empty()
    })
}

/// Placeholder shown while a remote image is in flight
pub fn placeholder_node(style: &ContentStyle) -> Node {
    asset_plane(&style.placeholder_asset, style)
}

/// Fallback shown when a remote fetch fails
pub fn error_node(style: &ContentStyle) -> Node {
    asset_plane(&style.error_asset, style)
}

fn asset_plane(asset: &str, style: &ContentStyle) -> Node {
    // Bundled fallback assets are square; the square case fills the height
    // budget on both axes.
    let (w, h) = image_plane_size(1, 1, style);
    Node {
        name: Some(CONTENT_NODE_NAME.to_string()),
        geometry: Some(Geometry::Plane {
            width: w,
            height: h,
            material: Material::NamedAsset(asset.to_string()),
        }),
        constraints: vec![Constraint::Billboard {
            axes: BillboardAxes::Y,
        }],
        ..Node::empty()
    }
}

/// Probe encoded image bytes for their pixel dimensions
fn probe_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    let reader = image::io::Reader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| Error::Content(format!("unrecognized image data: {}", e)))?;
    reader
        .into_dimensions()
        .map_err(|e| Error::Content(format!("cannot read image dimensions: {}", e)))
}
