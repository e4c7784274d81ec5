//! Shared test doubles and rig for pipeline integration tests

// Not every test binary uses every helper.
#![allow(dead_code)]

use arlock_common::config::Config;
use arlock_common::events::{ArEvent, EventBus};
use arlock_common::geometry::{Point2, Pose, RectNorm, Vec3};
use arlock_engine::anchor::AnchorId;
use arlock_engine::detect::{BarcodeDetector, FrameImage, Observation, Symbology};
use arlock_engine::error::{Error, Result};
use arlock_engine::fetch::ObjectStore;
use arlock_engine::pipeline::{AnchorPipeline, Frame, PipelineDeps, PipelineHandle};
use arlock_engine::scene::MemoryScene;
use arlock_engine::session::{HitFilter, HitResult, WorldTracking};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, oneshot};

/// One scripted detector outcome, consumed per detection round
pub enum DetectorStep {
    Hit(&'static str),
    Empty,
    Error,
}

/// Detector that replays a queue of outcomes
pub struct ScriptedDetector {
    steps: Mutex<VecDeque<DetectorStep>>,
}

impl ScriptedDetector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
        })
    }

    pub fn push(&self, step: DetectorStep) {
        self.steps.lock().unwrap().push_back(step);
    }
}

impl BarcodeDetector for ScriptedDetector {
    fn observe(&self, _image: &FrameImage, allow: &[Symbology]) -> Result<Vec<Observation>> {
        assert_eq!(allow, &[Symbology::Qr]);
        match self.steps.lock().unwrap().pop_front() {
            Some(DetectorStep::Hit(payload)) => Ok(vec![Observation {
                payload: payload.to_string(),
                region: RectNorm::new(0.4, 0.4, 0.2, 0.2),
            }]),
            Some(DetectorStep::Empty) | None => Ok(vec![]),
            Some(DetectorStep::Error) => Err(Error::Detector("scripted failure".into())),
        }
    }
}

/// Detector that blocks until released, for gate serialization tests
pub struct BlockingDetector {
    released: Mutex<bool>,
    condvar: Condvar,
}

impl BlockingDetector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            released: Mutex::new(false),
            condvar: Condvar::new(),
        })
    }

    pub fn release(&self) {
        *self.released.lock().unwrap() = true;
        self.condvar.notify_all();
    }
}

impl BarcodeDetector for BlockingDetector {
    fn observe(&self, _image: &FrameImage, _allow: &[Symbology]) -> Result<Vec<Observation>> {
        let mut released = self.released.lock().unwrap();
        while !*released {
            let (guard, timeout) = self
                .condvar
                .wait_timeout(released, Duration::from_secs(5))
                .unwrap();
            released = guard;
            assert!(!timeout.timed_out(), "blocking detector never released");
        }
        Ok(vec![])
    }
}

/// World tracking with scripted hit-test results
pub struct FakeTracking {
    hits: Mutex<Vec<HitResult>>,
    registered: Mutex<Vec<(AnchorId, Pose)>>,
    paused: AtomicBool,
}

impl FakeTracking {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            hits: Mutex::new(Vec::new()),
            registered: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
        })
    }

    pub fn set_hits(&self, hits: Vec<HitResult>) {
        *self.hits.lock().unwrap() = hits;
    }

    pub fn registered_anchors(&self) -> Vec<(AnchorId, Pose)> {
        self.registered.lock().unwrap().clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }
}

impl WorldTracking for FakeTracking {
    fn run(&self, _options: &arlock_common::config::SessionOptions) -> Result<()> {
        self.paused.store(false, Ordering::Release);
        Ok(())
    }

    fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    fn hit_test(&self, _point: Point2, _filter: HitFilter) -> Vec<HitResult> {
        self.hits.lock().unwrap().clone()
    }

    fn register_anchor(&self, pose: Pose) -> AnchorId {
        let id = uuid::Uuid::new_v4();
        self.registered.lock().unwrap().push((id, pose));
        id
    }
}

type StoreReply = std::result::Result<Vec<u8>, String>;

/// Object store whose replies the test resolves explicitly, in any order
pub struct ManualStore {
    waiters: Mutex<HashMap<String, VecDeque<oneshot::Sender<StoreReply>>>>,
}

impl ManualStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            waiters: Mutex::new(HashMap::new()),
        })
    }

    /// Complete one pending fetch for `key`, waiting briefly for the fetch
    /// task to register itself (dispatch and registration are asynchronous)
    pub async fn resolve(&self, key: &str, reply: StoreReply) {
        let mut reply = Some(reply);
        for _ in 0..500 {
            let sender = self
                .waiters
                .lock()
                .unwrap()
                .get_mut(key)
                .and_then(|q| q.pop_front());
            if let Some(sender) = sender {
                sender.send(reply.take().unwrap()).ok();
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("no pending fetch for key {}", key);
    }

    pub fn pending_count(&self, key: &str) -> usize {
        self.waiters
            .lock()
            .unwrap()
            .get(key)
            .map(|q| q.len())
            .unwrap_or(0)
    }

    /// Wait until a fetch for `key` is registered and pending
    pub async fn wait_for_pending(&self, key: &str) {
        for _ in 0..500 {
            if self.pending_count(key) > 0 {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("fetch for key {} never registered", key);
    }
}

#[async_trait]
impl ObjectStore for ManualStore {
    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        self.waiters
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back(tx);
        match rx.await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(msg)) => Err(Error::Fetch(msg)),
            Err(_) => Err(Error::Fetch("store dropped".into())),
        }
    }
}

/// Assembled pipeline with handles to every fake
pub struct TestRig {
    pub handle: PipelineHandle,
    pub tracking: Arc<FakeTracking>,
    pub scene: Arc<MemoryScene>,
    pub store: Arc<ManualStore>,
    pub events: broadcast::Receiver<ArEvent>,
}

impl TestRig {
    pub fn start(detector: Arc<dyn BarcodeDetector>, config: Config) -> Self {
        // RUST_LOG controls test log output; repeated init attempts are fine.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();

        let tracking = FakeTracking::new();
        let scene = Arc::new(MemoryScene::new());
        let store = ManualStore::new();
        let bus = EventBus::new(config.events.bus_capacity);
        let events = bus.subscribe();

        let deps = PipelineDeps {
            detector,
            tracking: tracking.clone(),
            scene: scene.clone(),
            store: store.clone(),
        };
        let (pipeline, handle) = AnchorPipeline::new(deps, config, bus);
        tokio::spawn(pipeline.run());

        Self {
            handle,
            tracking,
            scene,
            store,
            events,
        }
    }

    /// Wait (bounded) for the first event matching the predicate
    pub async fn wait_for<F>(&mut self, what: &str, pred: F) -> ArEvent
    where
        F: Fn(&ArEvent) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = self.events.recv().await.expect("event bus closed");
                if pred(&event) {
                    return event;
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", what))
    }
}

/// A dummy camera frame
pub fn frame() -> Frame {
    Frame {
        image: FrameImage::new(640, 480, vec![0u8; 16]),
    }
}

/// A hit result at depth `z`
pub fn hit_at(z: f32) -> HitResult {
    HitResult {
        pose: Pose::from_position(Vec3::new(0.0, 0.0, z)),
        distance: z.abs(),
    }
}

/// Minimal valid PNG bytes with the given dimensions
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::new(width, height);
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}
