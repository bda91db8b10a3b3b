//! Runner ordering against a shared clock
//!
//! The [`Sequencer`] trait is the seam the runner core depends on: enqueue
//! and dequeue against a shared clock, wake-up after convergence, and the
//! persisted-runner query the merge pass consults. [`Timeline`] is the
//! concrete facility: it registers one frame callback while it has work,
//! steps every started runner each tick, and retains finished runners for
//! their persist window so they stay addressable (and unmergeable) until it
//! expires.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::frame::{FrameId, FrameLoopHandle};
use crate::runner::{Persist, RunnerHandle, When};

/// The ordering facility a runner is scheduled against.
pub trait Sequencer {
    /// Enqueue a runner at `delay` relative to `when` on the shared clock.
    fn schedule(&mut self, runner: &RunnerHandle, delay: f64, when: When);

    /// Dequeue by runner id. Unknown ids are ignored.
    fn unschedule(&mut self, id: u64);

    /// Resume stepping if paused or idle. Called when queued work arrives on
    /// a declarative runner that may already have converged.
    fn resume(&mut self);

    /// Whether the runner is still addressable on this facility. Persisted
    /// runners are never merged away.
    fn is_persisted(&self, id: u64) -> bool;
}

pub type SequencerHandle = Rc<RefCell<dyn Sequencer>>;
pub type SequencerWeak = Weak<RefCell<dyn Sequencer>>;

struct ScheduledRunner {
    id: u64,
    runner: RunnerHandle,
    start: f64,
}

pub struct Timeline {
    weak_self: Weak<RefCell<Timeline>>,
    frame_loop: FrameLoopHandle,
    time: f64,
    paused: bool,
    frame: Option<FrameId>,
    schedule: Vec<ScheduledRunner>,
}

pub type TimelineHandle = Rc<RefCell<Timeline>>;

impl Timeline {
    pub fn new(frame_loop: &FrameLoopHandle) -> TimelineHandle {
        Rc::new_cyclic(|weak| {
            RefCell::new(Self {
                weak_self: weak.clone(),
                frame_loop: frame_loop.clone(),
                time: 0.0,
                paused: false,
                frame: None,
                schedule: Vec::new(),
            })
        })
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of runners currently addressable on this timeline.
    pub fn scheduled_count(&self) -> usize {
        self.schedule.len()
    }

    pub fn play(&mut self) {
        self.paused = false;
        self.ensure_frame();
    }

    /// Stop advancing the clock. The frame callback unregisters itself on
    /// the next tick.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    fn ensure_frame(&mut self) {
        if self.frame.is_some() {
            return;
        }
        let weak = self.weak_self.clone();
        self.frame = Some(self.frame_loop.borrow_mut().request_frame(move |dt| {
            if let Some(tl) = weak.upgrade() {
                Timeline::on_frame(&tl, dt);
            }
        }));
    }

    fn on_frame(tl: &TimelineHandle, dt: f64) {
        // Collect the work while borrowed, but release the guard before
        // stepping: queue callbacks re-enter the sequencer (resume, the
        // persisted-runner query) through the runner's weak handle.
        let steps: Vec<(RunnerHandle, f64)> = {
            let mut guard = tl.borrow_mut();
            let t = &mut *guard;
            if t.paused {
                if let Some(frame) = t.frame.take() {
                    t.frame_loop.borrow_mut().cancel_frame(frame);
                }
                return;
            }
            t.time += dt;
            let now = t.time;
            t.schedule
                .iter()
                .filter_map(|entry| {
                    let local = now - entry.start;
                    if local <= 0.0 {
                        return None;
                    }
                    let r = entry.runner.borrow();
                    if r.is_done() {
                        return None;
                    }
                    // first activation catches up to the shared clock,
                    // after that runners advance by the frame delta
                    let delta = if r.time() <= 0.0 { local } else { dt };
                    Some((entry.runner.clone(), delta))
                })
                .collect()
        };

        for (runner, delta) in &steps {
            runner.borrow_mut().step(*delta);
        }

        let mut guard = tl.borrow_mut();
        let t = &mut *guard;
        let now = t.time;

        let idle = t.schedule.iter().all(|entry| {
            now - entry.start > 0.0 && entry.runner.borrow().is_done()
        });

        // drop finished runners whose persist window has expired
        t.schedule.retain(|entry| {
            let runner = entry.runner.borrow();
            if !runner.is_done() {
                return true;
            }
            match runner.persist() {
                Persist::Forever => true,
                Persist::For(ms) => now <= entry.start + runner.duration() + ms,
            }
        });

        if idle && !t.paused {
            if let Some(frame) = t.frame.take() {
                t.frame_loop.borrow_mut().cancel_frame(frame);
            }
        }
    }
}

impl Sequencer for Timeline {
    fn schedule(&mut self, runner: &RunnerHandle, delay: f64, when: When) {
        let id = runner.borrow().id();
        self.unschedule(id);
        let start = match when {
            When::Absolute => delay,
            When::Now => self.time + delay,
            When::Last => {
                // after the latest finite end currently scheduled
                let mut end = self.time;
                for entry in &self.schedule {
                    let duration = entry.runner.borrow().duration();
                    if duration.is_finite() {
                        end = end.max(entry.start + duration);
                    }
                }
                end + delay
            }
        };
        debug!(runner = id, start, "schedule runner");
        runner
            .borrow_mut()
            .set_sequencer(self.weak_self.clone() as SequencerWeak);
        self.schedule.push(ScheduledRunner {
            id,
            runner: runner.clone(),
            start,
        });
        if !self.paused {
            self.ensure_frame();
        }
    }

    fn unschedule(&mut self, id: u64) {
        let before = self.schedule.len();
        self.schedule.retain(|entry| entry.id != id);
        if self.schedule.len() != before {
            debug!(runner = id, "unschedule runner");
        }
    }

    fn resume(&mut self) {
        self.play();
    }

    fn is_persisted(&self, id: u64) -> bool {
        self.schedule.iter().any(|entry| entry.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameLoop;
    use crate::runner::{Options, Runner};

    fn drive(fl: &FrameLoopHandle, frames: usize, dt: f64) {
        for _ in 0..frames {
            FrameLoop::tick(fl, dt);
        }
    }

    #[test]
    fn test_schedule_steps_runner() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(100.0);
        tl.borrow_mut().schedule(&runner, 0.0, When::Now);
        drive(&fl, 4, 16.0);
        let time = runner.borrow().time();
        assert!(time > 0.0, "runner should have been stepped, time={time}");
    }

    #[test]
    fn test_delay_defers_start() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(100.0);
        tl.borrow_mut().schedule(&runner, 100.0, When::Now);
        drive(&fl, 2, 16.0);
        assert_eq!(runner.borrow().time(), 0.0);
        drive(&fl, 8, 16.0);
        assert!(runner.borrow().time() > 0.0);
    }

    #[test]
    fn test_when_last_chains_after_previous() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let first = Runner::new(100.0);
        let second = Runner::new(100.0);
        tl.borrow_mut().schedule(&first, 0.0, When::Absolute);
        tl.borrow_mut().schedule(&second, 0.0, When::Last);
        drive(&fl, 4, 16.0); // 64ms: first mid-flight, second not started
        assert!(first.borrow().time() > 0.0);
        assert_eq!(second.borrow().time(), 0.0);
        drive(&fl, 6, 16.0); // past 100ms
        assert!(second.borrow().time() > 0.0);
    }

    #[test]
    fn test_finished_runner_expires_after_persist_window() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(50.0);
        let id = runner.borrow().id();
        tl.borrow_mut().schedule(&runner, 0.0, When::Absolute);
        assert!(tl.borrow().is_persisted(id));
        drive(&fl, 8, 16.0);
        assert!(runner.borrow().is_done());
        assert!(!tl.borrow().is_persisted(id));
    }

    #[test]
    fn test_persist_forever_stays_addressable() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(50.0);
        runner.borrow_mut().set_persist(Persist::Forever);
        let id = runner.borrow().id();
        tl.borrow_mut().schedule(&runner, 0.0, When::Absolute);
        drive(&fl, 20, 16.0);
        assert!(runner.borrow().is_done());
        assert!(tl.borrow().is_persisted(id));
    }

    #[test]
    fn test_idle_timeline_unregisters_and_resume_reregisters() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(50.0);
        tl.borrow_mut().schedule(&runner, 0.0, When::Absolute);
        drive(&fl, 10, 16.0);
        assert!(!fl.borrow().has_frame_callbacks());
        tl.borrow_mut().resume();
        assert!(fl.borrow().has_frame_callbacks());
    }

    #[test]
    fn test_pause_stops_clock() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(Options {
            duration: 1000.0,
            ..Options::default()
        });
        tl.borrow_mut().schedule(&runner, 0.0, When::Absolute);
        drive(&fl, 2, 16.0);
        let frozen = tl.borrow().time();
        tl.borrow_mut().pause();
        drive(&fl, 4, 16.0);
        assert_eq!(tl.borrow().time(), frozen);
    }

    #[test]
    fn test_reschedule_dedupes() {
        let fl = FrameLoop::new();
        let tl = Timeline::new(&fl);
        let runner = Runner::new(100.0);
        tl.borrow_mut().schedule(&runner, 0.0, When::Absolute);
        tl.borrow_mut().schedule(&runner, 10.0, When::Absolute);
        assert_eq!(tl.borrow().scheduled_count(), 1);
    }
}
