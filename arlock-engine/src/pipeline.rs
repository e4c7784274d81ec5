//! Anchoring pipeline orchestration
//!
//! Coordinates the detection gate, detector adapter, projector, anchor store,
//! and content builders against the external engines. The pipeline runs as a
//! single event-loop task that owns all anchor and scene mutation (the
//! "rendering context"); detection runs on a blocking worker and re-enters the
//! loop through a completion message, carrying the gate permit with it so the
//! gate is released exactly once on every outcome.
//!
//! Per-frame flow: gate admit -> background detection -> project region center
//! -> anchor store consult -> register / refresh -> content rebuild or fetch.

use arlock_common::config::{Config, ContentKind};
use arlock_common::events::{ArEvent, EventBus, FetchOutcome, SessionFaultKind};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::anchor::{AnchorId, AnchorStore, Disposition};
use crate::content::{self, CONTENT_NODE_NAME};
use crate::detect::{BarcodeDetector, DetectionResult, DetectorAdapter, FrameImage};
use crate::error::Result;
use crate::fetch::{fetch_object, FetchSequencer, ObjectStore};
use crate::gate::{DetectionGate, GatePermit};
use crate::project::Projector;
use crate::scene::SceneGraph;
use crate::session::{self, SessionEvent, WorldTracking};

/// Pipeline message channel depth
///
/// Frames are admitted through the gate before entering the channel, so the
/// channel never buffers more than one detection round plus completions.
const CHANNEL_CAPACITY: usize = 32;

/// One camera frame delivered by the tracking engine
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: FrameImage,
}

/// Messages processed by the pipeline event loop
enum PipelineMsg {
    /// Gate-admitted frame, detection not yet dispatched
    Detect { frame: Frame, permit: GatePermit },
    /// Background detection finished; permit released after handling
    DetectionFinished {
        result: Option<DetectionResult>,
        permit: GatePermit,
    },
    /// Tracking engine acknowledged a registered anchor
    AnchorBound { anchor_id: AnchorId },
    /// A remote object fetch completed
    FetchFinished {
        sequence: u64,
        key: String,
        result: Result<Vec<u8>>,
    },
    /// Session lifecycle notice from the tracking engine
    Session(SessionEvent),
    Shutdown,
}

/// External collaborators the pipeline orchestrates
pub struct PipelineDeps {
    pub detector: Arc<dyn BarcodeDetector>,
    pub tracking: Arc<dyn WorldTracking>,
    pub scene: Arc<dyn SceneGraph>,
    pub store: Arc<dyn ObjectStore>,
}

/// Submission handle given to the frame-delivery and engine callbacks
#[derive(Clone)]
pub struct PipelineHandle {
    gate: DetectionGate,
    tx: mpsc::Sender<PipelineMsg>,
}

impl PipelineHandle {
    /// Offer a frame for detection
    ///
    /// Invoked at capture cadence. Returns false when the frame was dropped
    /// because a detection round is already outstanding (frames are dropped,
    /// never queued). Cheap and non-blocking; safe to call from the frame
    /// delivery callback.
    pub fn frame(&self, frame: Frame) -> bool {
        let Some(permit) = self.gate.try_acquire() else {
            return false;
        };
        // If the channel is full or closed the permit drops here and the
        // gate releases immediately.
        self.tx
            .try_send(PipelineMsg::Detect { frame, permit })
            .is_ok()
    }

    /// Engine acknowledgment that a registered anchor is now session-tracked
    pub async fn anchor_bound(&self, anchor_id: AnchorId) {
        self.tx
            .send(PipelineMsg::AnchorBound { anchor_id })
            .await
            .ok();
    }

    /// Deliver a session lifecycle notice
    pub async fn session_event(&self, event: SessionEvent) {
        self.tx.send(PipelineMsg::Session(event)).await.ok();
    }

    /// Stop the pipeline event loop
    pub async fn shutdown(&self) {
        self.tx.send(PipelineMsg::Shutdown).await.ok();
    }
}

/// Single-anchor QR anchoring pipeline
pub struct AnchorPipeline {
    config: Config,
    adapter: Arc<DetectorAdapter>,
    tracking: Arc<dyn WorldTracking>,
    scene: Arc<dyn SceneGraph>,
    store: Arc<dyn ObjectStore>,
    projector: Projector,
    anchors: AnchorStore,
    fetches: FetchSequencer,
    bus: EventBus,
    rx: mpsc::Receiver<PipelineMsg>,
    tx: mpsc::Sender<PipelineMsg>,
    /// Frame intake suspended while the session is interrupted
    interrupted: bool,
    /// Set on a fatal session fault; the pipeline stops taking frames
    halted: bool,
    lighting_enabled: bool,
}

impl AnchorPipeline {
    /// Create the pipeline and its submission handle
    pub fn new(deps: PipelineDeps, config: Config, bus: EventBus) -> (Self, PipelineHandle) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let gate = DetectionGate::new();

        let handle = PipelineHandle {
            gate,
            tx: tx.clone(),
        };

        let pipeline = Self {
            adapter: Arc::new(DetectorAdapter::qr_only(deps.detector)),
            tracking: deps.tracking,
            scene: deps.scene,
            store: deps.store,
            projector: Projector::new(),
            anchors: AnchorStore::new(),
            fetches: FetchSequencer::new(),
            bus,
            rx,
            tx,
            config,
            interrupted: false,
            halted: false,
            lighting_enabled: false,
        };

        (pipeline, handle)
    }

    /// Start the tracking session and run the event loop to completion
    pub async fn run(mut self) {
        if let Err(e) = session::start_session(&*self.tracking, &self.config.session) {
            error!("Tracking session failed to start: {}", e);
            return;
        }
        info!(kind = ?self.config.content.kind, "Anchoring pipeline started");

        while let Some(msg) = self.rx.recv().await {
            match msg {
                PipelineMsg::Detect { frame, permit } => self.dispatch_detection(frame, permit),
                PipelineMsg::DetectionFinished { result, permit } => {
                    self.handle_detection(result);
                    // Gate released here, exactly once per round, regardless
                    // of success / empty / error outcome.
                    drop(permit);
                }
                PipelineMsg::AnchorBound { anchor_id } => self.handle_anchor_bound(anchor_id),
                PipelineMsg::FetchFinished {
                    sequence,
                    key,
                    result,
                } => self.handle_fetch_finished(sequence, key, result),
                PipelineMsg::Session(event) => self.handle_session_event(event),
                PipelineMsg::Shutdown => break,
            }
        }

        self.tracking.pause();
        info!("Anchoring pipeline stopped");
    }

    /// Hand a gate-admitted frame to the background detector
    fn dispatch_detection(&self, frame: Frame, permit: GatePermit) {
        if self.halted || self.interrupted {
            trace!("Frame dropped: pipeline suspended");
            // permit drops, gate releases
            return;
        }

        let adapter = Arc::clone(&self.adapter);
        let tx = self.tx.clone();
        tokio::task::spawn_blocking(move || {
            let result = adapter.detect(&frame.image);
            // If the loop is gone the permit drops with the message.
            tx.blocking_send(PipelineMsg::DetectionFinished { result, permit })
                .ok();
        });
    }

    /// Continuation of a detection round, back on the event-loop context
    fn handle_detection(&mut self, result: Option<DetectionResult>) {
        let Some(detection) = result else {
            self.emit(ArEvent::DetectionEmpty {
                timestamp: chrono::Utc::now(),
            });
            return;
        };

        let center = detection.region.center();
        let Some(pose) = self.projector.project(&*self.tracking, center) else {
            trace!(payload = %detection.payload, "No world intersection for detection");
            self.emit(ArEvent::ProjectionMissed {
                payload: detection.payload,
                timestamp: chrono::Utc::now(),
            });
            return;
        };

        match self.anchors.observe(&detection.payload, pose) {
            Disposition::Register => {
                let anchor_id = self.tracking.register_anchor(pose);
                if let Err(e) =
                    self.anchors
                        .registered(anchor_id, detection.payload.clone(), pose)
                {
                    warn!("Anchor registration not recorded: {}", e);
                    return;
                }
                self.emit(ArEvent::AnchorRegistered {
                    anchor_id,
                    payload: detection.payload,
                    pose,
                    timestamp: chrono::Utc::now(),
                });
            }
            Disposition::Deferred => {
                trace!("Detection recorded while engine acknowledgment pending");
            }
            Disposition::Refresh { content_changed } => {
                let Some(anchor_id) = self.anchors.anchor_id() else {
                    return;
                };
                // Pose refresh is unconditional tracking refinement.
                self.scene.set_transform(anchor_id, pose);
                self.emit(ArEvent::PoseRefreshed {
                    anchor_id,
                    pose,
                    timestamp: chrono::Utc::now(),
                });
                if content_changed {
                    self.rebuild_content(anchor_id, detection.payload);
                }
            }
        }
    }

    /// Engine acknowledged the anchor; build and attach its node tree
    fn handle_anchor_bound(&mut self, anchor_id: AnchorId) {
        let payload = match self.anchors.bind(anchor_id) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Ignoring bind callback: {}", e);
                return;
            }
        };

        let style = &self.config.content;
        let node = match self.config.content.kind {
            ContentKind::Text => content::build_text(&payload, style),
            ContentKind::Model => content::build_model(&payload, style),
            ContentKind::Image => content::placeholder_node(style),
        };
        self.scene.attach(anchor_id, node);
        if let Some(pose) = self.anchors.pose() {
            self.scene.set_transform(anchor_id, pose);
        }
        if !self.lighting_enabled {
            self.scene.enable_default_lighting();
            self.lighting_enabled = true;
        }
        self.emit(ArEvent::AnchorBound {
            anchor_id,
            timestamp: chrono::Utc::now(),
        });

        if self.config.content.kind == ContentKind::Image {
            self.dispatch_fetch(anchor_id, payload);
        }
    }

    /// Swap the anchor's content subtree for a changed payload
    fn rebuild_content(&mut self, anchor_id: AnchorId, payload: String) {
        let style = &self.config.content;
        match self.config.content.kind {
            ContentKind::Text => {
                let node = content::build_text(&payload, style);
                self.scene.replace_named(anchor_id, CONTENT_NODE_NAME, node);
                self.emit(ArEvent::ContentReplaced {
                    anchor_id,
                    payload,
                    timestamp: chrono::Utc::now(),
                });
            }
            ContentKind::Model => {
                let node = content::build_model(&payload, style);
                self.scene.replace_named(anchor_id, CONTENT_NODE_NAME, node);
                self.emit(ArEvent::ContentReplaced {
                    anchor_id,
                    payload,
                    timestamp: chrono::Utc::now(),
                });
            }
            ContentKind::Image => {
                // Placeholder-then-replace: the placeholder shows while the
                // fetch is in flight.
                let node = content::placeholder_node(style);
                self.scene.replace_named(anchor_id, CONTENT_NODE_NAME, node);
                self.dispatch_fetch(anchor_id, payload);
            }
        }
    }

    /// Start an asynchronous fetch for the payload-as-storage-key
    fn dispatch_fetch(&mut self, anchor_id: AnchorId, key: String) {
        let sequence = self.fetches.issue();
        self.emit(ArEvent::FetchStarted {
            anchor_id,
            key: key.clone(),
            sequence,
            timestamp: chrono::Utc::now(),
        });

        let store = Arc::clone(&self.store);
        let tx = self.tx.clone();
        let max_bytes = self.config.fetch.max_object_bytes;
        tokio::spawn(async move {
            let result = fetch_object(&*store, &key, max_bytes).await;
            tx.send(PipelineMsg::FetchFinished {
                sequence,
                key,
                result,
            })
            .await
            .ok();
        });
    }

    /// Apply a fetch completion, unless a newer fetch superseded it
    fn handle_fetch_finished(&mut self, sequence: u64, key: String, result: Result<Vec<u8>>) {
        let Some(anchor_id) = self.anchors.anchor_id() else {
            return;
        };

        if !self.fetches.is_current(sequence) {
            debug!(%key, sequence, "Discarding stale fetch result");
            self.emit(ArEvent::FetchFinished {
                anchor_id,
                key,
                sequence,
                outcome: FetchOutcome::Stale,
                timestamp: chrono::Utc::now(),
            });
            return;
        }

        let style = &self.config.content;
        let (node, outcome) = match result.and_then(|bytes| content::build_image(bytes, style)) {
            Ok(node) => (node, FetchOutcome::Applied),
            Err(e) => {
                warn!(%key, "Fetch failed, substituting error content: {}", e);
                (content::error_node(style), FetchOutcome::Failed)
            }
        };
        self.scene.replace_named(anchor_id, CONTENT_NODE_NAME, node);
        self.emit(ArEvent::FetchFinished {
            anchor_id,
            key: key.clone(),
            sequence,
            outcome,
            timestamp: chrono::Utc::now(),
        });
        if outcome == FetchOutcome::Applied {
            self.emit(ArEvent::ContentReplaced {
                anchor_id,
                payload: key,
                timestamp: chrono::Utc::now(),
            });
        }
    }

    /// Session faults and lifecycle notices
    fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Fault { kind, message } => {
                match kind {
                    SessionFaultKind::Recoverable => {
                        warn!("Recoverable session fault: {}", message);
                    }
                    SessionFaultKind::Fatal => {
                        error!("Fatal session fault, pausing session: {}", message);
                        self.tracking.pause();
                        self.halted = true;
                    }
                }
                self.emit(ArEvent::SessionFault {
                    kind,
                    message,
                    timestamp: chrono::Utc::now(),
                });
            }
            SessionEvent::Interrupted => {
                info!("Session interrupted, dropping frames");
                self.interrupted = true;
                self.emit(ArEvent::SessionInterrupted {
                    timestamp: chrono::Utc::now(),
                });
            }
            SessionEvent::InterruptionEnded => {
                info!("Session interruption ended");
                self.interrupted = false;
                self.emit(ArEvent::SessionResumed {
                    timestamp: chrono::Utc::now(),
                });
            }
        }
    }

    fn emit(&self, event: ArEvent) {
        // No subscribers is not an error for the pipeline.
        self.bus.emit(event).ok();
    }
}
