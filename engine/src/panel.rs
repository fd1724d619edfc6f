//! Panel worker: owns one panel's field data and evaluates frames.
//!
//! Each panel publishes its `current` buffer as an `Arc` in a
//! sphere-wide slot table. During a frame the worker snapshots every
//! panel's published `Arc` (a consistent pre-frame view, since slots
//! only change at commit), writes the new values into a thread-private
//! `next` buffer, reports readiness, and on commit atomically publishes
//! `next` as the new `current`. Readers therefore never observe a buffer
//! that is being written.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, PoisonError, RwLock};

use crate::adjacency::{adjacent, Adjacency};
use crate::field::{Divisions, FieldIndex};
use crate::partition::Partition;
use crate::sphere::{CoordMsg, SphereId};

/// Failure raised by a per-field function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct EvalError(pub String);

/// Per-frame view of a field's present neighbours' pre-frame values.
/// `ne` is `None` for pentagonal fields.
#[derive(Debug)]
pub struct Neighborhood<'a, T> {
    /// North-west neighbour value.
    pub nw: &'a T,
    /// West neighbour value.
    pub w: &'a T,
    /// South-west neighbour value.
    pub sw: &'a T,
    /// South-east neighbour value.
    pub se: &'a T,
    /// East neighbour value.
    pub e: &'a T,
    /// North-east neighbour value, absent for pentagons.
    pub ne: Option<&'a T>,
}

impl<T> Neighborhood<'_, T> {
    /// Number of present neighbours (5 or 6).
    #[must_use]
    pub fn present(&self) -> usize {
        if self.ne.is_some() {
            6
        } else {
            5
        }
    }
}

/// The function applied to every field once per frame. Receives the
/// field's address, its pre-frame value, its neighbours' pre-frame
/// values, and the frame's shared data; returns the field's next value.
pub type PerFieldFn<T, D> =
    dyn Fn(FieldIndex, &T, &Neighborhood<'_, T>, &D) -> Result<T, EvalError> + Send + Sync;

/// Messages a panel worker accepts.
pub(crate) enum PanelMsg<T, D> {
    /// Begin computing `next` for this frame.
    StartFrame { frame: u64, func: Arc<PerFieldFn<T, D>>, data: Arc<D> },
    /// Publish `next` as `current` and acknowledge.
    Commit { frame: u64, ack: Sender<u8> },
    /// Discard `next`; the frame failed elsewhere.
    Abort { frame: u64 },
    /// Stop the worker.
    Shutdown,
}

/// Address of one panel worker, as registered in the registry.
pub struct PanelHandle<T, D> {
    sphere: SphereId,
    panel: u8,
    pub(crate) tx: Sender<PanelMsg<T, D>>,
}

impl<T, D> Clone for PanelHandle<T, D> {
    fn clone(&self) -> Self {
        Self { sphere: self.sphere, panel: self.panel, tx: self.tx.clone() }
    }
}

impl<T, D> PanelHandle<T, D> {
    pub(crate) fn new(sphere: SphereId, panel: u8, tx: Sender<PanelMsg<T, D>>) -> Self {
        Self { sphere, panel, tx }
    }

    /// The sphere this panel belongs to.
    #[must_use]
    pub fn sphere(&self) -> SphereId {
        self.sphere
    }

    /// Panel index within the sphere.
    #[must_use]
    pub fn panel_index(&self) -> u8 {
        self.panel
    }
}

/// Published `current` buffers, one slot per panel. The owning worker is
/// the only writer of its slot; every reader clones the `Arc` under a
/// brief read lock.
pub(crate) struct PanelSlots<T> {
    slots: Vec<RwLock<Arc<Vec<T>>>>,
}

impl<T> PanelSlots<T> {
    pub(crate) fn new(buffers: Vec<Vec<T>>) -> Self {
        Self { slots: buffers.into_iter().map(|b| RwLock::new(Arc::new(b))).collect() }
    }

    pub(crate) fn snapshot(&self, panel: usize) -> Arc<Vec<T>> {
        Arc::clone(&self.slots[panel].read().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn snapshot_all(&self) -> Vec<Arc<Vec<T>>> {
        (0..self.slots.len()).map(|p| self.snapshot(p)).collect()
    }

    fn publish(&self, panel: usize, next: Vec<T>) {
        *self.slots[panel].write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
    }
}

/// Everything a worker needs that outlives individual frames.
pub(crate) struct PanelCtx<T, D> {
    pub(crate) sphere: SphereId,
    pub(crate) panel: u8,
    pub(crate) divisions: Divisions,
    pub(crate) partition: Arc<Partition>,
    pub(crate) slots: Arc<PanelSlots<T>>,
    pub(crate) coord: Sender<CoordMsg<T, D>>,
}

fn resolve<'a, T>(
    adj: &Adjacency,
    d: Divisions,
    partition: &Partition,
    snaps: &'a [Arc<Vec<T>>],
) -> Neighborhood<'a, T> {
    let value = |idx: FieldIndex| -> &'a T {
        let flat = idx.to_flat(d) as usize;
        let owner = usize::from(partition.owner[flat]);
        &snaps[owner][partition.local_index[flat] as usize]
    };
    Neighborhood {
        nw: value(adj.nw),
        w: value(adj.w),
        sw: value(adj.sw),
        se: value(adj.se),
        e: value(adj.e),
        ne: adj.ne.map(value),
    }
}

/// Worker main loop. `Idle -> Computing -> WaitCommit -> Idle`; every
/// write targets the private `next`, every read the published `current`.
pub(crate) fn run_panel<T, D>(ctx: &PanelCtx<T, D>, rx: &Receiver<PanelMsg<T, D>>)
where
    T: Clone + Send + Sync + 'static,
    D: Send + Sync + 'static,
{
    let fields = &ctx.partition.panels[usize::from(ctx.panel)].fields;
    while let Ok(msg) = rx.recv() {
        match msg {
            PanelMsg::StartFrame { frame, func, data } => {
                if let Some(next) = compute_next(ctx, fields, frame, func.as_ref(), &data) {
                    if !wait_commit(ctx, rx, frame, next) {
                        break;
                    }
                }
            }
            // Stale frame control for a frame this worker already
            // resolved; nothing to do.
            PanelMsg::Commit { ack, .. } => {
                let _ = ack.send(ctx.panel);
            }
            PanelMsg::Abort { .. } => {}
            PanelMsg::Shutdown => break,
        }
    }
}

fn compute_next<T, D>(
    ctx: &PanelCtx<T, D>,
    fields: &[u32],
    frame: u64,
    func: &PerFieldFn<T, D>,
    data: &D,
) -> Option<Vec<T>>
where
    T: Clone + Send + Sync,
{
    let snaps = ctx.slots.snapshot_all();
    let own = &snaps[usize::from(ctx.panel)];
    let mut next = Vec::with_capacity(fields.len());
    for (li, &flat) in fields.iter().enumerate() {
        let idx = FieldIndex::from_flat(flat, ctx.divisions);
        let adj = adjacent(idx, ctx.divisions);
        let nbh = resolve(&adj, ctx.divisions, &ctx.partition, &snaps);
        let outcome =
            catch_unwind(AssertUnwindSafe(|| func(idx, &own[li], &nbh, data)));
        let cause = match outcome {
            Ok(Ok(value)) => {
                next.push(value);
                continue;
            }
            Ok(Err(err)) => err.0,
            Err(panic) => panic_message(&panic),
        };
        tracing::debug!(sphere = %ctx.sphere, panel = ctx.panel, field = flat, "field evaluation failed");
        let _ = ctx.coord.send(CoordMsg::EvalFailed { panel: ctx.panel, frame, field: flat, cause });
        return None;
    }
    let _ = ctx.coord.send(CoordMsg::Ready { panel: ctx.panel, frame });
    Some(next)
}

/// Returns false when the worker must stop instead of going back to
/// `Idle`.
fn wait_commit<T, D>(
    ctx: &PanelCtx<T, D>,
    rx: &Receiver<PanelMsg<T, D>>,
    frame: u64,
    next: Vec<T>,
) -> bool
where
    T: Clone + Send + Sync,
{
    let mut held = Some(next);
    while let Ok(msg) = rx.recv() {
        match msg {
            PanelMsg::Commit { frame: f, ack } if f == frame => {
                if let Some(next) = held.take() {
                    ctx.slots.publish(usize::from(ctx.panel), next);
                }
                let _ = ack.send(ctx.panel);
                return true;
            }
            PanelMsg::Abort { frame: f } if f == frame => {
                return true;
            }
            // Stale control messages for older frames are dropped.
            PanelMsg::Commit { ack, .. } => {
                let _ = ack.send(ctx.panel);
            }
            PanelMsg::Abort { .. } => {}
            PanelMsg::StartFrame { .. } => {}
            PanelMsg::Shutdown => return false,
        }
    }
    false
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "per-field function panicked".to_string()
    }
}
