//! # arlock anchoring engine (arlock-engine)
//!
//! QR-to-world anchoring pipeline: detect a QR code in a live frame stream,
//! project its bounding-region center onto the reconstructed environment, keep
//! one persistent anchor locked to that surface, and refresh the anchored
//! content only when the decoded payload changes.
//!
//! **Architecture:** a single event-loop task owns all anchor and scene state;
//! detection runs on a blocking worker gated to one outstanding round; remote
//! image fetches are independent tasks whose completions are sequence-checked
//! against staleness. The tracking engine, barcode service, scene graph, and
//! object storage are external collaborators behind trait seams.

pub mod anchor;
pub mod content;
pub mod detect;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod pipeline;
pub mod project;
pub mod scene;
pub mod session;

pub use error::{Error, Result};
pub use pipeline::{AnchorPipeline, Frame, PipelineDeps, PipelineHandle};
