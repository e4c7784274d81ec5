//! Scene-graph boundary
//!
//! The rendering engine consumes node trees produced by the content builder.
//! The pipeline only ever attaches a tree to an anchor, swaps a named content
//! subtree, or assigns a transform; everything else (drawing, lighting,
//! constraint evaluation) belongs to the engine.
//!
//! `MemoryScene` is a headless implementation backing the test suite and any
//! host without a real renderer.

use arlock_common::geometry::Pose;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::anchor::AnchorId;
use crate::content::Node;

/// Rendering engine surface the pipeline produces to
pub trait SceneGraph: Send + Sync {
    /// Attach a node tree under the given anchor
    fn attach(&self, anchor: AnchorId, node: Node);

    /// Replace the named subtree under the anchor; returns false if the
    /// anchor or the named node is unknown
    fn replace_named(&self, anchor: AnchorId, name: &str, node: Node) -> bool;

    /// Assign the anchor node's world transform
    fn set_transform(&self, anchor: AnchorId, pose: Pose);

    /// Turn on the engine's default lighting (done once, on first attach)
    fn enable_default_lighting(&self);
}

#[derive(Debug, Default)]
struct MemorySceneState {
    nodes: HashMap<AnchorId, Node>,
    transforms: HashMap<AnchorId, Pose>,
    default_lighting: bool,
    replacements: u64,
}

/// Headless scene graph
#[derive(Debug, Default)]
pub struct MemoryScene {
    state: Mutex<MemorySceneState>,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current node tree for an anchor
    pub fn node(&self, anchor: AnchorId) -> Option<Node> {
        self.state.lock().unwrap().nodes.get(&anchor).cloned()
    }

    /// Current transform for an anchor
    pub fn transform(&self, anchor: AnchorId) -> Option<Pose> {
        self.state.lock().unwrap().transforms.get(&anchor).copied()
    }

    pub fn default_lighting(&self) -> bool {
        self.state.lock().unwrap().default_lighting
    }

    /// Number of successful named-subtree replacements
    pub fn replacement_count(&self) -> u64 {
        self.state.lock().unwrap().replacements
    }
}

impl SceneGraph for MemoryScene {
    fn attach(&self, anchor: AnchorId, node: Node) {
        debug!(%anchor, "Attaching node tree");
        self.state.lock().unwrap().nodes.insert(anchor, node);
    }

    fn replace_named(&self, anchor: AnchorId, name: &str, node: Node) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.nodes.get_mut(&anchor) {
            Some(root) => {
                let replaced = root.replace(name, node);
                if replaced {
                    state.replacements += 1;
                } else {
                    warn!(%anchor, name, "Named node not found for replacement");
                }
                replaced
            }
            None => {
                warn!(%anchor, "Replacement requested for unknown anchor");
                false
            }
        }
    }

    fn set_transform(&self, anchor: AnchorId, pose: Pose) {
        self.state.lock().unwrap().transforms.insert(anchor, pose);
    }

    fn enable_default_lighting(&self) {
        self.state.lock().unwrap().default_lighting = true;
    }
}
