//! Host-loop glue
//!
//! The [`FrameLoop`] is the seam to whatever delivers frame time deltas. It
//! holds two callback arenas: persistent per-frame callbacks (a timeline
//! registers one while it has work) and one-shot *immediate* tasks that run
//! after all frame callbacks of a tick (per-target transform commits are
//! batched through these).
//!
//! Cancellation of an unknown or already-run handle is a no-op, and
//! cancel-then-reschedule within one tick never skips the tick; both are
//! load-bearing for the commit batching.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Handle for a persistent per-frame callback.
    pub struct FrameId;
    /// Handle for a one-shot deferred task.
    pub struct TaskId;
}

type FrameCb = Box<dyn FnMut(f64)>;
type Task = Box<dyn FnOnce()>;

pub struct FrameLoop {
    // Frame callback slots hold `None` while their callback is mid-run so
    // a callback can cancel itself or others reentrantly.
    frames: SlotMap<FrameId, Option<FrameCb>>,
    frame_order: Vec<FrameId>,
    tasks: SlotMap<TaskId, Task>,
    task_order: Vec<TaskId>,
}

pub type FrameLoopHandle = Rc<RefCell<FrameLoop>>;

impl FrameLoop {
    pub fn new() -> FrameLoopHandle {
        Rc::new(RefCell::new(Self {
            frames: SlotMap::with_key(),
            frame_order: Vec::new(),
            tasks: SlotMap::with_key(),
            task_order: Vec::new(),
        }))
    }

    /// Register a persistent per-frame callback.
    pub fn request_frame(&mut self, cb: impl FnMut(f64) + 'static) -> FrameId {
        let id = self.frames.insert(Some(Box::new(cb)));
        self.frame_order.push(id);
        id
    }

    /// Unregister a frame callback. Unknown handles are ignored.
    pub fn cancel_frame(&mut self, id: FrameId) {
        self.frames.remove(id);
    }

    /// Queue a one-shot task to run after this (or the next) tick's frame
    /// callbacks.
    pub fn immediate(&mut self, task: impl FnOnce() + 'static) -> TaskId {
        let id = self.tasks.insert(Box::new(task));
        self.task_order.push(id);
        id
    }

    /// Drop a queued task. Unknown or already-run handles are ignored.
    pub fn cancel_immediate(&mut self, id: TaskId) {
        self.tasks.remove(id);
    }

    pub fn has_frame_callbacks(&self) -> bool {
        !self.frames.is_empty()
    }

    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Deliver one tick: run every frame callback with `dt`, then drain the
    /// immediate queue (including tasks the drained tasks schedule).
    ///
    /// The loop's cell is never borrowed while a callback runs, so callbacks
    /// may freely register and cancel.
    pub fn tick(this: &FrameLoopHandle, dt: f64) {
        let ids: Vec<FrameId> = {
            let mut guard = this.borrow_mut();
            let fl = &mut *guard;
            let frames = &fl.frames;
            fl.frame_order.retain(|id| frames.contains_key(*id));
            fl.frame_order.clone()
        };

        for id in ids {
            let cb = this.borrow_mut().frames.get_mut(id).and_then(Option::take);
            if let Some(mut cb) = cb {
                cb(dt);
                let mut fl = this.borrow_mut();
                if let Some(slot) = fl.frames.get_mut(id) {
                    *slot = Some(cb);
                }
            }
        }

        loop {
            let next = {
                let mut guard = this.borrow_mut();
                let fl = &mut *guard;
                let tasks = &fl.tasks;
                fl.task_order.retain(|id| tasks.contains_key(*id));
                if fl.task_order.is_empty() {
                    None
                } else {
                    Some(fl.task_order.remove(0))
                }
            };
            let Some(id) = next else { break };
            let task = this.borrow_mut().tasks.remove(id);
            if let Some(task) = task {
                task();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_frame_callback_runs_every_tick() {
        let fl = FrameLoop::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        fl.borrow_mut().request_frame(move |_| c.set(c.get() + 1));
        FrameLoop::tick(&fl, 16.0);
        FrameLoop::tick(&fl, 16.0);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_cancelled_frame_does_not_run() {
        let fl = FrameLoop::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let id = fl.borrow_mut().request_frame(move |_| c.set(c.get() + 1));
        fl.borrow_mut().cancel_frame(id);
        FrameLoop::tick(&fl, 16.0);
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn test_frame_callback_can_cancel_itself() {
        let fl = FrameLoop::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let fl2 = fl.clone();
        let id = Rc::new(Cell::new(None));
        let id2 = id.clone();
        let handle = fl.borrow_mut().request_frame(move |_| {
            c.set(c.get() + 1);
            if let Some(own) = id2.get() {
                fl2.borrow_mut().cancel_frame(own);
            }
        });
        id.set(Some(handle));
        FrameLoop::tick(&fl, 16.0);
        FrameLoop::tick(&fl, 16.0);
        assert_eq!(count.get(), 1);
        assert!(!fl.borrow().has_frame_callbacks());
    }

    #[test]
    fn test_immediate_runs_once() {
        let fl = FrameLoop::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        fl.borrow_mut().immediate(move || c.set(c.get() + 1));
        FrameLoop::tick(&fl, 16.0);
        FrameLoop::tick(&fl, 16.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_cancel_and_reschedule_collapses_to_one_run() {
        let fl = FrameLoop::new();
        let count = Rc::new(Cell::new(0));
        for _ in 0..3 {
            let c = count.clone();
            let mut fl_mut = fl.borrow_mut();
            // mimic the commit batching: cancel whatever is pending, then
            // schedule again
            let pending: Vec<TaskId> = fl_mut.task_order.clone();
            for id in pending {
                fl_mut.cancel_immediate(id);
            }
            fl_mut.immediate(move || c.set(c.get() + 1));
        }
        FrameLoop::tick(&fl, 16.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_task_scheduled_by_task_runs_same_tick() {
        let fl = FrameLoop::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let fl2 = fl.clone();
        fl.borrow_mut().immediate(move || {
            let c2 = c.clone();
            fl2.borrow_mut().immediate(move || c2.set(c2.get() + 1));
        });
        FrameLoop::tick(&fl, 16.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_cancel_unknown_handle_is_noop() {
        let fl = FrameLoop::new();
        let id = fl.borrow_mut().immediate(|| {});
        FrameLoop::tick(&fl, 16.0);
        // already ran; cancelling afterwards must not panic
        fl.borrow_mut().cancel_immediate(id);
    }
}
