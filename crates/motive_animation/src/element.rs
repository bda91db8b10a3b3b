//! The animation-facing wrapper around a scene-graph target
//!
//! An [`Element`] owns the [`Target`] it animates on behalf of the runtime,
//! the per-target [`RunnerSet`] of transform contributions, and the handle
//! of its pending commit task. Transform writes are batched: however many
//! runners register within one tick, the composed matrix is committed to the
//! target exactly once, via a deferred task that is cancelled and
//! re-registered idempotently.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use motive_core::{Bounds, Matrix, Target};
use tracing::trace;

use crate::frame::{FrameLoopHandle, TaskId};
use crate::runner::RunnerHandle;
use crate::track::{RunnerSet, Tracked};

pub struct Element {
    node: Box<dyn Target>,
    runners: RunnerSet,
    frame: Option<TaskId>,
    frame_loop: FrameLoopHandle,
}

pub type ElementHandle = Rc<RefCell<Element>>;
pub type ElementWeak = Weak<RefCell<Element>>;

impl Element {
    pub fn new(node: impl Target + 'static, frame_loop: &FrameLoopHandle) -> ElementHandle {
        Rc::new(RefCell::new(Self {
            node: Box::new(node),
            runners: RunnerSet::new(),
            frame: None,
            frame_loop: frame_loop.clone(),
        }))
    }

    pub fn get(&self, prop: &str) -> f64 {
        self.node.get(prop)
    }

    pub fn set(&mut self, prop: &str, value: f64) {
        self.node.set(prop, value);
    }

    pub fn matrix(&self) -> Matrix {
        self.node.matrix()
    }

    pub fn bounds(&self) -> Bounds {
        self.node.bounds()
    }

    pub fn runner_count(&self) -> usize {
        self.runners.len()
    }

    pub fn tracks_runner(&self, id: u64) -> bool {
        self.runners.contains(id)
    }

    /// Register a transform-contributing runner and (re)schedule the commit
    /// task for this tick. Safe to call any number of times per tick.
    pub fn add_runner(el: &ElementHandle, runner: &RunnerHandle, id: u64) {
        let mut e = el.borrow_mut();
        let e = &mut *e;
        if e.runners.is_empty() {
            // lazily seed with the target's current matrix so composition
            // is well-defined before any runner produces output
            let base = e.node.matrix();
            e.runners.seed(base);
        }
        e.runners.add(runner, id);

        let weak = Rc::downgrade(el);
        let mut fl = e.frame_loop.borrow_mut();
        if let Some(task) = e.frame.take() {
            fl.cancel_immediate(task);
        }
        e.frame = Some(fl.immediate(move || {
            if let Some(el) = weak.upgrade() {
                Element::commit(&el);
            }
        }));
    }

    /// Compose the net transform in registration order, write it to the
    /// target once, then run the merge pass.
    pub fn commit(el: &ElementHandle) {
        let mut guard = el.borrow_mut();
        let e = &mut *guard;
        let net = e.runners.net_transform();
        trace!(runners = e.runners.len(), "committing net transform");
        e.node.set_matrix(net);
        e.runners.merge();
        e.frame = None;
    }

    /// Prune every runner registered before `id` and drop their un-run
    /// transform queue entries; absolute transforms overwrite anything
    /// earlier, so that work would be wasted.
    pub fn clear_runners_before(&mut self, id: u64) {
        for removed in self.runners.clear_before(id) {
            if let Tracked::Live { runner, .. } = removed {
                runner.borrow_mut().drop_transform_entries();
            }
        }
    }
}
