//! Sphere coordinator: spawns panel workers, runs the frame protocol,
//! and surfaces frame-complete and inactivity events.
//!
//! One coordinator thread per sphere owns the frame state machine:
//! broadcast `start_frame` to every worker, collect the ready set, run
//! the synchronous commit round-trip, then notify the frame's reply
//! channel. `get_all_field_data` is serialised through the same mailbox,
//! so a snapshot can never observe a half-committed frame.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crate::config::SphereConfig;
use crate::field::{Divisions, FieldIndex};
use crate::panel::{run_panel, PanelCtx, PanelHandle, PanelMsg, PanelSlots, PerFieldFn};
use crate::partition::{auto_panel_count, build_partition, PartitionError};
use crate::registry::Registry;

/// Opaque, process-unique sphere identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SphereId(u64);

impl SphereId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SphereId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sphere-{}", self.0)
    }
}

/// Errors surfaced by sphere operations.
#[derive(Debug, thiserror::Error)]
pub enum SphereError {
    /// Divisions must be a positive integer.
    #[error("divisions must be at least 1 (got {0})")]
    InvalidDivisions(u32),
    /// The sphere is not (or no longer) registered.
    #[error("unknown sphere {0}")]
    UnknownSphere(SphereId),
    /// `start_frame` while a frame is already running.
    #[error("{0} is already in a frame")]
    AlreadyInFrame(SphereId),
    /// A per-field function failed; the frame was aborted and the
    /// pre-frame state retained.
    #[error("evaluation failed at field {field}: {cause}")]
    PerFieldEvaluationFailed {
        /// Flattened index of the failing field.
        field: u32,
        /// Failure description from the user function.
        cause: String,
    },
    /// The sphere-data function failed; no frame was started.
    #[error("sphere data function failed: {0}")]
    SphereDataFailed(String),
    /// The frame wall-clock bound expired; fatal for the sphere.
    #[error("frame timed out on {0}")]
    FrameTimeout(SphereId),
    /// A panel worker is gone; fatal for the sphere.
    #[error("panel worker {0} is unavailable")]
    WorkerUnavailable(u8),
    /// Partitioning failed at sphere creation.
    #[error(transparent)]
    Partition(#[from] PartitionError),
    /// A worker or coordinator thread could not be spawned.
    #[error("failed to spawn sphere thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Outcome of one `start_frame`, delivered to the frame's reply channel.
/// Exactly one event is sent per accepted `start_frame`.
#[derive(Debug)]
pub enum FrameEvent {
    /// Every panel committed; the new state is visible.
    FrameComplete(SphereId),
    /// The frame was aborted; the pre-frame state is retained unless the
    /// error is fatal.
    FrameFailed(SphereId, SphereError),
}

/// Lifecycle notifications sent to a sphere's parent channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SphereEvent {
    /// No operation arrived within the inactivity timeout; the sphere
    /// hibernated (state retained, next operation resumes it).
    Inactive(SphereId),
}

/// Function evaluated once per frame to produce the shared sphere data.
pub type SphereDataFn<D> = dyn Fn() -> D + Send + Sync;

/// Shared data for one frame: a literal value, or a function the
/// coordinator evaluates once before broadcasting the frame.
pub enum FrameData<D> {
    /// Use this value as-is.
    Literal(Arc<D>),
    /// Evaluate once, then broadcast the result.
    Compute(Arc<SphereDataFn<D>>),
}

impl<D> FrameData<D> {
    /// Wrap a plain value.
    #[must_use]
    pub fn literal(data: D) -> Self {
        FrameData::Literal(Arc::new(data))
    }
}

/// Coordinator mailbox messages. Workers report through the same channel
/// the public handle sends operations on.
pub(crate) enum CoordMsg<T, D> {
    StartFrame {
        func: Arc<PerFieldFn<T, D>>,
        data: FrameData<D>,
        reply: Sender<FrameEvent>,
        resp: Sender<Result<(), SphereError>>,
    },
    Ready {
        panel: u8,
        frame: u64,
    },
    EvalFailed {
        panel: u8,
        frame: u64,
        field: u32,
        cause: String,
    },
    GetAll {
        resp: Sender<HashMap<u32, T>>,
    },
    InFrame {
        resp: Sender<bool>,
    },
    Teardown {
        resp: Sender<()>,
    },
}

/// Client handle to a running sphere. Cheap to clone; all operations are
/// serialised through the coordinator mailbox.
pub struct SphereHandle<T, D = ()> {
    id: SphereId,
    divisions: Divisions,
    panel_count: u8,
    tx: Sender<CoordMsg<T, D>>,
}

impl<T, D> Clone for SphereHandle<T, D> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            divisions: self.divisions,
            panel_count: self.panel_count,
            tx: self.tx.clone(),
        }
    }
}

impl<T, D> SphereHandle<T, D> {
    /// Sphere identifier.
    #[must_use]
    pub fn id(&self) -> SphereId {
        self.id
    }

    /// Edge subdivision count, immutable for the sphere's lifetime.
    #[must_use]
    pub fn divisions(&self) -> Divisions {
        self.divisions
    }

    /// Number of panels (4 or 8).
    #[must_use]
    pub fn panel_count(&self) -> u8 {
        self.panel_count
    }

    /// Begin a frame: apply `func` to every field. Acceptance is
    /// synchronous; completion arrives later as exactly one
    /// [`FrameEvent`] on `reply`.
    ///
    /// # Errors
    /// `AlreadyInFrame` while a frame is running; `SphereDataFailed` if
    /// the data function fails; `UnknownSphere` after teardown.
    pub fn start_frame(
        &self,
        func: Arc<PerFieldFn<T, D>>,
        data: FrameData<D>,
        reply: Sender<FrameEvent>,
    ) -> Result<(), SphereError> {
        let (resp, resp_rx) = channel();
        self.tx
            .send(CoordMsg::StartFrame { func, data, reply, resp })
            .map_err(|_| SphereError::UnknownSphere(self.id))?;
        resp_rx.recv().map_err(|_| SphereError::UnknownSphere(self.id))?
    }

    /// Snapshot of every field's value keyed by flattened index. During
    /// a frame this is the pre-frame state; immediately after a
    /// `FrameComplete` it is the post-frame state from every panel.
    ///
    /// # Errors
    /// `UnknownSphere` after teardown.
    pub fn get_all_field_data(&self) -> Result<HashMap<u32, T>, SphereError> {
        let (resp, resp_rx) = channel();
        self.tx.send(CoordMsg::GetAll { resp }).map_err(|_| SphereError::UnknownSphere(self.id))?;
        resp_rx.recv().map_err(|_| SphereError::UnknownSphere(self.id))
    }

    /// True while a frame is running.
    ///
    /// # Errors
    /// `UnknownSphere` after teardown.
    pub fn in_frame(&self) -> Result<bool, SphereError> {
        let (resp, resp_rx) = channel();
        self.tx.send(CoordMsg::InFrame { resp }).map_err(|_| SphereError::UnknownSphere(self.id))?;
        resp_rx.recv().map_err(|_| SphereError::UnknownSphere(self.id))
    }

    /// Stop the workers and remove the sphere from the registry.
    ///
    /// # Errors
    /// `UnknownSphere` if already torn down.
    pub fn teardown(&self) -> Result<(), SphereError> {
        let (resp, resp_rx) = channel();
        self.tx
            .send(CoordMsg::Teardown { resp })
            .map_err(|_| SphereError::UnknownSphere(self.id))?;
        resp_rx.recv().map_err(|_| SphereError::UnknownSphere(self.id))
    }
}

/// Create a sphere: compute centroids, partition into panels, spawn one
/// worker per panel plus the coordinator, and register the handles.
/// `init` provides the initial value of every field. `parent`, when
/// given, receives [`SphereEvent::Inactive`] notifications.
///
/// # Errors
/// `InvalidDivisions` for `divisions < 1`; `Partition` if panel
/// construction fails; `Spawn` if a thread cannot be started.
pub fn spawn_sphere<T, D>(
    registry: &Registry<T, D>,
    divisions: Divisions,
    init: impl Fn(FieldIndex) -> T,
    config: SphereConfig,
    parent: Option<Sender<SphereEvent>>,
) -> Result<SphereHandle<T, D>, SphereError>
where
    T: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    if divisions < 1 {
        return Err(SphereError::InvalidDivisions(divisions));
    }
    let id = SphereId::next();
    let cents = crate::centroid::centroids(divisions);
    let panel_count = config.panel_count.unwrap_or_else(auto_panel_count);
    let partition = Arc::new(build_partition(divisions, &cents, panel_count)?);

    let buffers: Vec<Vec<T>> = partition
        .panels
        .iter()
        .map(|set| {
            set.fields.iter().map(|&flat| init(FieldIndex::from_flat(flat, divisions))).collect()
        })
        .collect();
    let slots = Arc::new(PanelSlots::new(buffers));

    let (coord_tx, coord_rx) = channel();
    let mut worker_txs: Vec<Sender<PanelMsg<T, D>>> = Vec::with_capacity(usize::from(panel_count));
    let mut joins: Vec<JoinHandle<()>> = Vec::with_capacity(usize::from(panel_count));
    let mut panel_handles: Vec<PanelHandle<T, D>> = Vec::with_capacity(usize::from(panel_count));

    for p in 0..panel_count {
        let (tx, rx) = channel();
        let ctx = PanelCtx {
            sphere: id,
            panel: p,
            divisions,
            partition: Arc::clone(&partition),
            slots: Arc::clone(&slots),
            coord: coord_tx.clone(),
        };
        let spawned = std::thread::Builder::new()
            .name(format!("geof-panel-{id}-{p}"))
            .spawn(move || run_panel(&ctx, &rx));
        match spawned {
            // Already-spawned workers exit on their own once every sender
            // to their mailbox is dropped.
            Ok(join) => joins.push(join),
            Err(e) => return Err(e.into()),
        }
        panel_handles.push(PanelHandle::new(id, p, tx.clone()));
        worker_txs.push(tx);
    }

    let handle =
        SphereHandle { id, divisions, panel_count, tx: coord_tx.clone() };
    let coordinator = Coordinator {
        id,
        config,
        partition,
        slots,
        worker_txs,
        joins,
        parent,
        registry: registry.clone(),
    };
    std::thread::Builder::new()
        .name(format!("geof-{id}"))
        .spawn(move || coordinator.run(&coord_rx))?;
    registry.register(handle.clone(), panel_handles);
    tracing::info!(sphere = %id, divisions, panels = panel_count, "sphere created");
    Ok(handle)
}

struct FrameState {
    frame: u64,
    ready: Vec<bool>,
    ready_count: u8,
    reply: Sender<FrameEvent>,
    started: Instant,
}

enum Exit {
    Teardown(Sender<()>),
    Fatal,
    Disconnected,
}

struct Coordinator<T, D> {
    id: SphereId,
    config: SphereConfig,
    partition: Arc<crate::partition::Partition>,
    slots: Arc<PanelSlots<T>>,
    worker_txs: Vec<Sender<PanelMsg<T, D>>>,
    joins: Vec<JoinHandle<()>>,
    parent: Option<Sender<SphereEvent>>,
    registry: Registry<T, D>,
}

impl<T, D> Coordinator<T, D>
where
    T: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    fn run(mut self, rx: &Receiver<CoordMsg<T, D>>) {
        let mut frame: Option<FrameState> = None;
        let mut frame_counter: u64 = 0;
        let mut hibernating = false;

        let exit = loop {
            let msg = if let Some(fs) = frame.as_ref() {
                match self.config.frame_timeout {
                    Some(limit) => {
                        let left = limit.saturating_sub(fs.started.elapsed());
                        match rx.recv_timeout(left) {
                            Ok(m) => m,
                            Err(RecvTimeoutError::Timeout) => {
                                tracing::error!(sphere = %self.id, frame = fs.frame, "frame timed out");
                                if let Some(fs) = frame.take() {
                                    let _ = fs.reply.send(FrameEvent::FrameFailed(
                                        self.id,
                                        SphereError::FrameTimeout(self.id),
                                    ));
                                }
                                break Exit::Fatal;
                            }
                            Err(RecvTimeoutError::Disconnected) => break Exit::Disconnected,
                        }
                    }
                    None => match rx.recv() {
                        Ok(m) => m,
                        Err(_) => break Exit::Disconnected,
                    },
                }
            } else if hibernating {
                match rx.recv() {
                    Ok(m) => m,
                    Err(_) => break Exit::Disconnected,
                }
            } else if let Some(idle) = self.config.inactivity_timeout {
                match rx.recv_timeout(idle) {
                    Ok(m) => m,
                    Err(RecvTimeoutError::Timeout) => {
                        tracing::info!(sphere = %self.id, "inactive, hibernating");
                        if let Some(parent) = &self.parent {
                            let _ = parent.send(SphereEvent::Inactive(self.id));
                        }
                        hibernating = true;
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break Exit::Disconnected,
                }
            } else {
                match rx.recv() {
                    Ok(m) => m,
                    Err(_) => break Exit::Disconnected,
                }
            };

            if hibernating {
                tracing::debug!(sphere = %self.id, "resumed from hibernation");
                hibernating = false;
            }

            match msg {
                CoordMsg::StartFrame { func, data, reply, resp } => {
                    if frame.is_some() {
                        let _ = resp.send(Err(SphereError::AlreadyInFrame(self.id)));
                        continue;
                    }
                    let data = match self.frame_data(data) {
                        Ok(d) => d,
                        Err(e) => {
                            let _ = resp.send(Err(e));
                            continue;
                        }
                    };
                    frame_counter += 1;
                    let frame_id = frame_counter;
                    if let Err(panel) = self.broadcast_start(frame_id, &func, &data) {
                        let _ = resp.send(Err(SphereError::WorkerUnavailable(panel)));
                        break Exit::Fatal;
                    }
                    tracing::debug!(sphere = %self.id, frame = frame_id, "frame started");
                    frame = Some(FrameState {
                        frame: frame_id,
                        ready: vec![false; self.worker_txs.len()],
                        ready_count: 0,
                        reply,
                        started: Instant::now(),
                    });
                    let _ = resp.send(Ok(()));
                }
                CoordMsg::Ready { panel, frame: f } => {
                    let complete = match frame.as_mut() {
                        Some(fs) if fs.frame == f && !fs.ready[usize::from(panel)] => {
                            fs.ready[usize::from(panel)] = true;
                            fs.ready_count += 1;
                            usize::from(fs.ready_count) == self.worker_txs.len()
                        }
                        // A ready for an aborted or older frame.
                        _ => false,
                    };
                    if complete {
                        if let Some(fs) = frame.take() {
                            match self.commit(fs.frame) {
                                Ok(()) => {
                                    tracing::debug!(sphere = %self.id, frame = fs.frame, "frame complete");
                                    let _ = fs.reply.send(FrameEvent::FrameComplete(self.id));
                                }
                                Err(panel) => {
                                    let _ = fs.reply.send(FrameEvent::FrameFailed(
                                        self.id,
                                        SphereError::WorkerUnavailable(panel),
                                    ));
                                    break Exit::Fatal;
                                }
                            }
                        }
                    }
                }
                CoordMsg::EvalFailed { panel, frame: f, field, cause } => {
                    let matches = frame.as_ref().is_some_and(|fs| fs.frame == f);
                    if !matches {
                        continue;
                    }
                    if let Some(fs) = frame.take() {
                        tracing::warn!(sphere = %self.id, frame = f, panel, field, "frame aborted");
                        for tx in &self.worker_txs {
                            let _ = tx.send(PanelMsg::Abort { frame: f });
                        }
                        let _ = fs.reply.send(FrameEvent::FrameFailed(
                            self.id,
                            SphereError::PerFieldEvaluationFailed { field, cause },
                        ));
                    }
                }
                CoordMsg::GetAll { resp } => {
                    let _ = resp.send(self.collect_all());
                }
                CoordMsg::InFrame { resp } => {
                    let _ = resp.send(frame.is_some());
                }
                CoordMsg::Teardown { resp } => break Exit::Teardown(resp),
            }
        };

        for tx in &self.worker_txs {
            let _ = tx.send(PanelMsg::Shutdown);
        }
        for join in self.joins.drain(..) {
            let _ = join.join();
        }
        self.registry.remove_sphere(self.id);
        tracing::info!(sphere = %self.id, "sphere torn down");
        if let Exit::Teardown(resp) = exit {
            let _ = resp.send(());
        }
    }

    /// Evaluate the sphere-data source once, containing any failure.
    fn frame_data(&self, data: FrameData<D>) -> Result<Arc<D>, SphereError> {
        match data {
            FrameData::Literal(d) => Ok(d),
            FrameData::Compute(f) => catch_unwind(AssertUnwindSafe(|| f()))
                .map(Arc::new)
                .map_err(|_| SphereError::SphereDataFailed("sphere data function panicked".into())),
        }
    }

    fn broadcast_start(
        &self,
        frame: u64,
        func: &Arc<PerFieldFn<T, D>>,
        data: &Arc<D>,
    ) -> Result<(), u8> {
        for (p, tx) in self.worker_txs.iter().enumerate() {
            let msg = PanelMsg::StartFrame {
                frame,
                func: Arc::clone(func),
                data: Arc::clone(data),
            };
            tx.send(msg).map_err(|_| p as u8)?;
        }
        Ok(())
    }

    /// Synchronous commit round-trip: broadcast, then await one ack per
    /// panel so a snapshot taken after `FrameComplete` sees every panel's
    /// new state. Returns the first unreachable panel on failure.
    fn commit(&self, frame: u64) -> Result<(), u8> {
        let _span = tracing::info_span!("commit", sphere = %self.id, frame).entered();
        let (ack_tx, ack_rx) = channel();
        let mut acked = vec![false; self.worker_txs.len()];
        for (p, tx) in self.worker_txs.iter().enumerate() {
            tx.send(PanelMsg::Commit { frame, ack: ack_tx.clone() }).map_err(|_| p as u8)?;
        }
        drop(ack_tx);
        for _ in 0..self.worker_txs.len() {
            match ack_rx.recv() {
                Ok(panel) => acked[usize::from(panel)] = true,
                Err(_) => {
                    let missing = acked.iter().position(|&a| !a).unwrap_or(0);
                    return Err(missing as u8);
                }
            }
        }
        Ok(())
    }

    fn collect_all(&self) -> HashMap<u32, T> {
        let mut out = HashMap::with_capacity(self.partition.owner.len());
        for (p, set) in self.partition.panels.iter().enumerate() {
            let snap = self.slots.snapshot(p);
            for (li, &flat) in set.fields.iter().enumerate() {
                out.insert(flat, snap[li].clone());
            }
        }
        out
    }
}
