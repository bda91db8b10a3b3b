//! The runner: one animation instance's time, queue, and retarget state
//!
//! A runner converts elapsed wall-clock time into a normalized playback
//! position (honoring looping, swing, reversal, and per-cycle waits), drives
//! its morph queue at that position, and lets in-flight work be retargeted
//! without restarting. Declarative runners skip the fixed-duration
//! arithmetic entirely and complete on per-step convergence instead.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use motive_core::{Bounds, Matrix};
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::easing::Easing;
use crate::element::{Element, ElementHandle, ElementWeak};
use crate::morph::{Morph, MorpherHandle, Value};
use crate::spring::SpringConfig;
use crate::stepper::Stepper;
use crate::timeline::{SequencerHandle, SequencerWeak};
use crate::Error;

/// Default fixed duration in milliseconds.
pub const DEFAULT_DURATION_MS: f64 = 400.0;

/// Nominal single-frame tick in milliseconds.
pub const DEFAULT_FRAME_MS: f64 = 16.0;

/// Nudge applied at exact cycle boundaries before rounding, so position is
/// exactly 0 or 1 at the extremes despite modulo wraparound.
const BOUNDARY_EPSILON: f64 = 1e-5;

// Runner ids are process-wide and never reused. Id 0 is reserved: external
// maps key contributions by `id + 1` with 0 as the empty sentinel.
static NEXT_RUNNER_ID: AtomicU64 = AtomicU64::new(1);

/// Placement of a scheduled runner on the shared clock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum When {
    /// After the end of the last scheduled runner.
    #[default]
    Last,
    /// Relative to the clock's current time.
    Now,
    /// At an absolute clock time.
    Absolute,
}

/// How long a finished runner stays addressable on its ordering facility.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Persist {
    For(f64),
    Forever,
}

/// Notification kinds observable on a runner. Delivery is synchronous,
/// within the `step` call that caused them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerEvent {
    Start,
    Step,
    Finished,
}

/// Construction options; each field is independently defaulted.
#[derive(Clone, Copy, Debug)]
pub struct Options {
    pub duration: f64,
    pub delay: f64,
    pub times: f64,
    pub swing: bool,
    pub wait: f64,
    pub when: When,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            duration: DEFAULT_DURATION_MS,
            delay: 0.0,
            times: 1.0,
            swing: false,
            wait: 0.0,
            when: When::Last,
        }
    }
}

impl Options {
    /// Replace missing or nonsensical numeric fields with their defaults.
    fn normalized(mut self) -> Self {
        if !(self.duration > 0.0) {
            self.duration = DEFAULT_DURATION_MS;
        }
        if !(self.delay >= 0.0) {
            self.delay = 0.0;
        }
        if !(self.times >= 1.0) {
            self.times = 1.0;
        }
        if !(self.wait >= 0.0) {
            self.wait = 0.0;
        }
        self
    }
}

impl From<f64> for Options {
    fn from(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }
}

/// How a runner's steppers are driven; resolved once at construction.
#[derive(Clone, Copy, Debug)]
enum Driver {
    Fixed { duration: f64, easing: Easing },
    Declarative(SpringConfig),
}

pub type InitFn = Box<dyn FnMut(&mut JobCx<'_>)>;
pub type RunFn = Box<dyn FnMut(&mut JobCx<'_>, f64) -> bool>;
pub type RetargetFn = Box<dyn FnMut(&Value)>;

/// One queued unit of work.
struct QueueEntry {
    id: u64,
    init: Option<InitFn>,
    run: Option<RunFn>,
    retarget: Option<RetargetFn>,
    is_transform: bool,
    initialised: bool,
    finished: bool,
}

struct HistoryEntry {
    entry: u64,
    morpher: MorpherHandle,
}

/// Per-step context handed to queue entry callbacks. Gives them the pieces
/// of runner state they may touch without re-borrowing the runner itself.
pub struct JobCx<'a> {
    pub runner_id: u64,
    pub declarative: bool,
    transforms: &'a mut Matrix,
    element: Option<&'a ElementWeak>,
    runner: &'a Weak<RefCell<Runner>>,
}

impl JobCx<'_> {
    pub fn element(&self) -> Option<ElementHandle> {
        self.element.and_then(Weak::upgrade)
    }

    /// Accumulate a transform contribution for this frame.
    pub fn add_transform(&mut self, m: &Matrix) {
        self.transforms.lmultiply(m);
    }

    pub fn clear_transform(&mut self) {
        *self.transforms = Matrix::identity();
    }

    /// Register the owning runner with the target's runner collection.
    /// Idempotent within a frame.
    pub fn register_transform_runner(&self) {
        if let (Some(el), Some(runner)) = (self.element(), self.runner.upgrade()) {
            Element::add_runner(&el, &runner, self.runner_id);
        }
    }

    /// Prune every runner registered before this one; absolute transforms
    /// overwrite their output anyway.
    pub fn clear_runners_before(&self) {
        if let Some(el) = self.element() {
            el.borrow_mut().clear_runners_before(self.runner_id);
        }
    }
}

pub struct Runner {
    id: u64,
    weak_self: Weak<RefCell<Runner>>,
    element: Option<ElementWeak>,
    sequencer: Option<SequencerWeak>,
    driver: Driver,
    /// Fixed span per cycle; infinite for declarative runners so the
    /// duration-based done logic never trips.
    base_duration: f64,
    time: f64,
    last_time: f64,
    last_position: f64,
    times: f64,
    swing: bool,
    wait: f64,
    reverse: bool,
    enabled: bool,
    reseted: bool,
    done: bool,
    persist: Persist,
    queue: Vec<QueueEntry>,
    next_entry: u64,
    history: FxHashMap<String, HistoryEntry>,
    transforms: Matrix,
    listeners: Vec<(RunnerEvent, Box<dyn FnMut()>)>,
}

pub type RunnerHandle = Rc<RefCell<Runner>>;

impl Runner {
    /// A fixed-duration runner. Accepts a bare duration or full [`Options`].
    pub fn new(options: impl Into<Options>) -> RunnerHandle {
        let o = options.into().normalized();
        let driver = Driver::Fixed {
            duration: o.duration,
            easing: Easing::default(),
        };
        Self::with_driver(driver, &o)
    }

    /// A declarative runner driven by spring convergence instead of a fixed
    /// duration.
    pub fn declarative(config: SpringConfig) -> RunnerHandle {
        Self::with_driver(Driver::Declarative(config), &Options::default())
    }

    fn with_driver(driver: Driver, o: &Options) -> RunnerHandle {
        let declarative = matches!(driver, Driver::Declarative(_));
        Rc::new_cyclic(|weak| {
            RefCell::new(Self {
                id: NEXT_RUNNER_ID.fetch_add(1, Ordering::Relaxed),
                weak_self: weak.clone(),
                element: None,
                sequencer: None,
                base_duration: match driver {
                    Driver::Fixed { duration, .. } => duration,
                    Driver::Declarative(_) => f64::INFINITY,
                },
                driver,
                time: 0.0,
                last_time: 0.0,
                last_position: f64::NAN,
                times: o.times,
                swing: o.swing,
                wait: o.wait,
                reverse: false,
                enabled: true,
                reseted: true,
                done: false,
                persist: if declarative {
                    Persist::Forever
                } else {
                    Persist::For(0.0)
                },
                queue: Vec::new(),
                next_entry: 0,
                history: FxHashMap::default(),
                transforms: Matrix::identity(),
                listeners: Vec::new(),
            })
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn is_reset(&self) -> bool {
        self.reseted
    }

    pub fn is_declarative(&self) -> bool {
        matches!(self.driver, Driver::Declarative(_))
    }

    /// The matrix this runner currently contributes for the frame just
    /// processed.
    pub fn transforms(&self) -> Matrix {
        self.transforms
    }

    pub fn active(&self) -> bool {
        self.enabled
    }

    pub fn set_active(&mut self, enabled: bool) -> &mut Self {
        self.enabled = enabled;
        self
    }

    pub fn reversed(&self) -> bool {
        self.reverse
    }

    pub fn set_reverse(&mut self, reverse: bool) -> &mut Self {
        self.reverse = reverse;
        self
    }

    pub fn persist(&self) -> Persist {
        self.persist
    }

    pub fn set_persist(&mut self, persist: Persist) -> &mut Self {
        self.persist = persist;
        self
    }

    /// Replace the easing curve. No effect on declarative runners.
    pub fn ease(&mut self, easing: Easing) -> &mut Self {
        if let Driver::Fixed { easing: e, .. } = &mut self.driver {
            *e = easing;
        }
        self
    }

    /// Configure looping. A `times` of zero or NaN means unbounded.
    pub fn repeat(&mut self, times: f64, swing: bool, wait: f64) -> &mut Self {
        self.times = if times >= 1.0 { times } else { f64::INFINITY };
        self.swing = swing;
        self.wait = if wait >= 0.0 { wait } else { 0.0 };
        self
    }

    pub fn set_element(&mut self, el: &ElementHandle) -> &mut Self {
        self.element = Some(Rc::downgrade(el));
        self
    }

    pub fn element(&self) -> Option<ElementHandle> {
        self.element.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_sequencer(&mut self, seq: SequencerWeak) -> &mut Self {
        self.sequencer = Some(seq);
        self
    }

    pub fn sequencer(&self) -> Option<SequencerHandle> {
        self.sequencer.as_ref().and_then(Weak::upgrade)
    }

    /// Enqueue on an ordering facility; falls back to the runner's own.
    /// Scheduling with neither is the one fatal precondition.
    pub fn schedule(
        runner: &RunnerHandle,
        timeline: Option<&SequencerHandle>,
        delay: f64,
        when: When,
    ) -> Result<(), Error> {
        let seq = match timeline {
            Some(seq) => seq.clone(),
            None => runner.borrow().sequencer().ok_or(Error::NoTimeline)?,
        };
        seq.borrow_mut().schedule(runner, delay, when);
        Ok(())
    }

    pub fn unschedule(runner: &RunnerHandle) {
        let (seq, id) = {
            let r = runner.borrow();
            (r.sequencer(), r.id())
        };
        if let Some(seq) = seq {
            seq.borrow_mut().unschedule(id);
        }
    }

    /// Whether the owning ordering facility still addresses this runner.
    pub fn is_persisted(&self) -> bool {
        self.sequencer()
            .map_or(false, |seq| seq.borrow().is_persisted(self.id))
    }

    // =========================================================================
    // Time and position model
    // =========================================================================

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Jump to an absolute runner time by stepping the difference.
    pub fn set_time(&mut self, t: f64) -> &mut Self {
        let dt = t - self.time;
        self.step(dt);
        self
    }

    /// Total span including waits; the final cycle has no trailing wait.
    pub fn duration(&self) -> f64 {
        self.times * (self.wait + self.base_duration) - self.wait
    }

    /// Completed loops plus fractional progress within the current cycle,
    /// capped at the repeat count.
    pub fn loops(&self) -> f64 {
        let cycle = self.base_duration + self.wait;
        let whole = (self.time / cycle).floor();
        let fraction = (self.time - whole * cycle) / self.base_duration;
        (whole + fraction).min(self.times)
    }

    pub fn set_loops(&mut self, p: f64) -> &mut Self {
        let cycle = self.base_duration + self.wait;
        let whole = p.floor();
        self.set_time(cycle * whole + self.base_duration * (p - whole))
    }

    /// Overall progress in `[0, 1]` over the full (looped) duration.
    pub fn progress(&self) -> f64 {
        (self.time / self.duration()).min(1.0)
    }

    pub fn set_progress(&mut self, p: f64) -> &mut Self {
        self.set_time(p * self.duration())
    }

    fn raw_position(&self, x: f64) -> f64 {
        let cycle = self.wait + self.base_duration;
        let swinging = self.swing && ((x % (2.0 * cycle)) / cycle).floor() as i64 == 1;
        let backwards = swinging != self.reverse;
        let fraction = (x % cycle) / self.base_duration;
        let unclipped = if backwards { 1.0 - fraction } else { fraction };
        unclipped.clamp(0.0, 1.0)
    }

    /// Normalized position within the current cycle, honoring swing,
    /// reversal, and waits. Exactly 0 or 1 at the time extremes.
    pub fn position(&self) -> f64 {
        let end = self.duration();
        if self.time <= 0.0 {
            self.raw_position(BOUNDARY_EPSILON).round()
        } else if self.time < end {
            self.raw_position(self.time)
        } else {
            self.raw_position(end - BOUNDARY_EPSILON).round()
        }
    }

    /// Seek so the current cycle shows position `p`, accounting for the
    /// cycle's direction (swing parity combined with reversal).
    pub fn set_position(&mut self, p: f64) -> &mut Self {
        let loops_done = self.loops().floor();
        let swinging = self.swing && (loops_done as i64) % 2 == 1;
        let backwards = swinging != self.reverse;
        let sub = if backwards { 1.0 - p } else { p };
        self.set_loops(loops_done + sub)
    }

    // =========================================================================
    // Stepping state machine
    // =========================================================================

    /// Advance by an elapsed-time delta and drive the queue.
    pub fn step(&mut self, dt: f64) -> &mut Self {
        if !self.enabled {
            return self;
        }
        self.time += dt;
        let position = self.position();
        let running = self.last_position != position && self.time >= 0.0;
        self.last_position = position;

        let duration = self.duration();
        let just_started = self.last_time <= 0.0 && self.time > 0.0;
        let just_finished = self.last_time < duration && self.time >= duration;
        self.last_time = self.time;

        if just_started {
            self.fire(RunnerEvent::Start);
        }

        // Provisional: set before running the queue so transform steps can
        // see they are in their final frame (that makes them mergeable).
        let declarative = self.is_declarative();
        self.done = !declarative && !just_finished && self.time >= duration;
        self.reseted = false;

        let mut converged = false;
        if running || declarative {
            self.initialise(running);
            self.transforms = Matrix::identity();
            converged = self.run_queue(if declarative { dt } else { position });
            self.fire(RunnerEvent::Step);
        }
        trace!(id = self.id, time = self.time, position, "runner step");

        // Declarative runners know themselves when they converged.
        self.done = self.done || (converged && declarative);
        if just_finished {
            self.fire(RunnerEvent::Finished);
        }
        self
    }

    /// Advance by one nominal frame.
    pub fn tick(&mut self) -> &mut Self {
        self.step(DEFAULT_FRAME_MS)
    }

    /// Force immediate completion by stepping to infinite elapsed time.
    pub fn finish(&mut self) -> &mut Self {
        self.step(f64::INFINITY)
    }

    /// Rewind to time zero. A no-op on a pristine, never-stepped runner.
    pub fn reset(&mut self) -> &mut Self {
        if self.reseted {
            return self;
        }
        if self.time.is_finite() {
            self.set_time(0.0);
        } else {
            // finish() left time at infinity; a delta cannot rewind that
            self.time = 0.0;
            self.last_time = 0.0;
            self.step(0.0);
        }
        self.reseted = true;
        self
    }

    /// Observe a runner notification.
    ///
    /// Callbacks fire synchronously inside `step` and must not call back
    /// into the ordering facility driving that step.
    pub fn on(&mut self, event: RunnerEvent, f: impl FnMut() + 'static) -> &mut Self {
        self.listeners.push((event, Box::new(f)));
        self
    }

    /// Run a callback once the runner's duration has elapsed.
    pub fn after(&mut self, f: impl FnMut() + 'static) -> &mut Self {
        self.on(RunnerEvent::Finished, f)
    }

    fn fire(&mut self, event: RunnerEvent) {
        for (kind, listener) in self.listeners.iter_mut() {
            if *kind == event {
                listener();
            }
        }
    }

    // =========================================================================
    // Queue drive
    // =========================================================================

    /// Enqueue one unit of work. Insertion order is execution order.
    pub fn queue(
        &mut self,
        init: Option<InitFn>,
        run: Option<RunFn>,
        retarget: Option<RetargetFn>,
        is_transform: bool,
    ) -> &mut Self {
        let id = self.next_entry;
        self.next_entry += 1;
        self.queue.push(QueueEntry {
            id,
            init,
            run,
            retarget,
            is_transform,
            initialised: false,
            finished: false,
        });
        // a declarative runner may have converged and idled its facility
        self.resume_sequencer();
        self
    }

    /// Run a callback every active frame at the current position (or frame
    /// delta when declarative); its return value reports convergence.
    pub fn during(&mut self, mut f: impl FnMut(f64) -> bool + 'static) -> &mut Self {
        self.queue(
            None,
            Some(Box::new(move |_cx: &mut JobCx<'_>, pos| f(pos))),
            None,
            false,
        )
    }

    fn initialise(&mut self, mut running: bool) {
        let declarative = self.is_declarative();
        if !running && !declarative {
            return;
        }
        let Runner {
            queue,
            transforms,
            element,
            weak_self,
            id,
            ..
        } = self;
        let mut cx = JobCx {
            runner_id: *id,
            declarative,
            transforms,
            element: element.as_ref(),
            runner: weak_self,
        };
        for entry in queue.iter_mut() {
            // strict sequencing: later fixed-duration work stays
            // uninitialized until everything before it has finished;
            // declarative work re-checks every step
            let needs = declarative || (!entry.initialised && running);
            running = !entry.finished;
            if needs && running {
                if let Some(init) = entry.init.as_mut() {
                    init(&mut cx);
                }
                entry.initialised = true;
            }
        }
    }

    fn run_queue(&mut self, pos_or_dt: f64) -> bool {
        let declarative = self.is_declarative();
        let Runner {
            queue,
            transforms,
            element,
            weak_self,
            id,
            ..
        } = self;
        let mut cx = JobCx {
            runner_id: *id,
            declarative,
            transforms,
            element: element.as_ref(),
            runner: weak_self,
        };
        let mut all_finished = true;
        for entry in queue.iter_mut() {
            let converged = entry
                .run
                .as_mut()
                .map_or(false, |run| run(&mut cx, pos_or_dt));
            entry.finished = entry.finished || converged;
            all_finished = all_finished && entry.finished;
        }
        all_finished
    }

    /// Drop transform-type queue entries; called when an absolute transform
    /// supersedes this runner's output. Skipped while the runner is done and
    /// still persisted, since its committed state must stay reproducible.
    pub(crate) fn drop_transform_entries(&mut self) {
        if !self.done || !self.is_persisted() {
            self.queue.retain(|entry| !entry.is_transform);
        }
    }

    // =========================================================================
    // Retargeting
    // =========================================================================

    /// Remember a morpher for later retargeting, keyed by property name and
    /// tied to the most recently queued entry.
    pub fn remember(&mut self, name: &str, morpher: MorpherHandle) {
        let entry = self.queue.last().map(|e| e.id).unwrap_or(0);
        self.history
            .insert(name.to_string(), HistoryEntry { entry, morpher });
        // a declarative controller can converge before any retarget ever
        // arrives; its facility must not be stuck idle
        if self.is_declarative() {
            self.resume_sequencer();
        }
    }

    /// Redirect in-flight work on `name` to a new target. Returns false when
    /// the caller should queue fresh work instead: nothing remembered, or
    /// the remembered entry never initialized (it is pruned here).
    pub fn try_retarget(&mut self, name: &str, target: Value) -> bool {
        let Some(history) = self.history.get(name) else {
            return false;
        };
        let Some(index) = self.queue.iter().position(|e| e.id == history.entry) else {
            self.history.remove(name);
            return false;
        };
        if !self.queue[index].initialised {
            self.queue.remove(index);
            self.history.remove(name);
            return false;
        }
        // composite operations carry their own retarget with access to
        // per-entry state; everything else just moves the morpher's target
        if let Some(retarget) = self.queue[index].retarget.as_mut() {
            retarget(&target);
        } else {
            history.morpher.borrow_mut().retarget(&target);
        }
        self.queue[index].finished = false;
        self.done = false;
        self.resume_sequencer();
        true
    }

    fn resume_sequencer(&self) {
        if let Some(seq) = self.sequencer() {
            seq.borrow_mut().resume();
        }
    }

    fn stepper(&self) -> Stepper {
        match self.driver {
            Driver::Fixed { easing, .. } => Stepper::Ease(easing),
            Driver::Declarative(config) => Stepper::Spring(config),
        }
    }

    // =========================================================================
    // Animatable operations
    // =========================================================================

    /// Animate a named scalar property toward `to`, retargeting in-flight
    /// work when possible.
    pub fn prop(&mut self, name: &str, to: f64) -> &mut Self {
        if self.try_retarget(name, Value::Number(to)) {
            return self;
        }
        let morph = Rc::new(RefCell::new(Morph::<f64>::new(self.stepper())));
        morph.borrow_mut().to(to);

        let init_morph = morph.clone();
        let init_name = name.to_string();
        let run_morph = morph.clone();
        let run_name = name.to_string();
        self.queue(
            Some(Box::new(move |cx: &mut JobCx<'_>| {
                if let Some(el) = cx.element() {
                    let from = el.borrow().get(&init_name);
                    init_morph.borrow_mut().from(from);
                }
            })),
            Some(Box::new(move |cx: &mut JobCx<'_>, pos| {
                let value = run_morph.borrow_mut().at(pos);
                if let Some(el) = cx.element() {
                    el.borrow_mut().set(&run_name, value);
                }
                run_morph.borrow().done()
            })),
            None,
            false,
        );
        self.remember(name, morph);
        self
    }

    /// Animate a named scalar property by a relative amount. Retargeting
    /// rebases on the originally captured starting value.
    pub fn prop_delta(&mut self, name: &str, by: f64) -> &mut Self {
        if self.try_retarget(name, Value::Number(by)) {
            return self;
        }
        let morph = Rc::new(RefCell::new(Morph::<f64>::new(self.stepper())));
        let from_value = Rc::new(Cell::new(0.0));

        let init_morph = morph.clone();
        let init_from = from_value.clone();
        let init_name = name.to_string();
        let run_morph = morph.clone();
        let run_name = name.to_string();
        let retarget_morph = morph.clone();
        let retarget_from = from_value.clone();
        self.queue(
            Some(Box::new(move |cx: &mut JobCx<'_>| {
                if let Some(el) = cx.element() {
                    let from = el.borrow().get(&init_name);
                    init_from.set(from);
                    let mut m = init_morph.borrow_mut();
                    m.from(from);
                    m.to(from + by);
                }
            })),
            Some(Box::new(move |cx: &mut JobCx<'_>, pos| {
                let value = run_morph.borrow_mut().at(pos);
                if let Some(el) = cx.element() {
                    el.borrow_mut().set(&run_name, value);
                }
                run_morph.borrow().done()
            })),
            Some(Box::new(move |target: &Value| {
                if let Value::Number(by) = target {
                    retarget_morph.borrow_mut().to(retarget_from.get() + by);
                }
            })),
            false,
        );
        self.remember(name, morph);
        self
    }

    pub fn x(&mut self, x: f64) -> &mut Self {
        self.prop("x", x)
    }

    pub fn y(&mut self, y: f64) -> &mut Self {
        self.prop("y", y)
    }

    pub fn dx(&mut self, by: f64) -> &mut Self {
        self.prop_delta("x", by)
    }

    pub fn dy(&mut self, by: f64) -> &mut Self {
        self.prop_delta("y", by)
    }

    pub fn cx(&mut self, x: f64) -> &mut Self {
        self.prop("cx", x)
    }

    pub fn cy(&mut self, y: f64) -> &mut Self {
        self.prop("cy", y)
    }

    pub fn width(&mut self, w: f64) -> &mut Self {
        self.prop("width", w)
    }

    pub fn height(&mut self, h: f64) -> &mut Self {
        self.prop("height", h)
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.x(x).y(y)
    }

    pub fn center(&mut self, x: f64, y: f64) -> &mut Self {
        self.cx(x).cy(y)
    }

    /// Animate width and height together; a missing dimension is derived
    /// from the element's bounding-box aspect ratio.
    pub fn size(&mut self, width: Option<f64>, height: Option<f64>) -> &mut Self {
        let (w, h) = match (width, height) {
            (Some(w), Some(h)) => (w, h),
            (Some(w), None) => {
                let b = self.element_bounds();
                let h = if b.width > 0.0 { b.height / b.width * w } else { 0.0 };
                (w, h)
            }
            (None, Some(h)) => {
                let b = self.element_bounds();
                let w = if b.height > 0.0 { b.width / b.height * h } else { 0.0 };
                (w, h)
            }
            (None, None) => return self,
        };
        self.width(w).height(h)
    }

    fn element_bounds(&self) -> Bounds {
        self.element()
            .map(|el| el.borrow().bounds())
            .unwrap_or_default()
    }

    /// Animate toward a transform matrix. Relative transforms compose onto
    /// whatever came before; absolute ones prune every earlier runner on the
    /// target since their output is overwritten anyway.
    pub fn transform(&mut self, target: Matrix, relative: bool) -> &mut Self {
        if self.is_declarative()
            && !relative
            && self.try_retarget("transform", Value::Matrix(target))
        {
            return self;
        }
        let morph = Rc::new(RefCell::new(Morph::<Matrix>::new(self.stepper())));
        // per-entry state, shared between the entry's callbacks
        let goal = Rc::new(Cell::new(target));
        let start = Rc::new(Cell::new(Matrix::identity()));
        let current: Rc<Cell<Option<Matrix>>> = Rc::new(Cell::new(None));

        let init_start = start.clone();
        let run_morph = morph.clone();
        let run_goal = goal.clone();
        let run_start = start.clone();
        let run_current = current.clone();
        let retarget_goal = goal.clone();
        self.queue(
            Some(Box::new(move |cx: &mut JobCx<'_>| {
                let base = if relative {
                    Matrix::identity()
                } else {
                    cx.element()
                        .map(|el| el.borrow().matrix())
                        .unwrap_or_default()
                };
                init_start.set(base);
                cx.register_transform_runner();
                if !relative {
                    cx.clear_runners_before();
                }
            })),
            Some(Box::new(move |cx: &mut JobCx<'_>, pos| {
                if !relative {
                    // absolute: this runner's contribution stands alone
                    cx.clear_transform();
                }
                let from = if cx.declarative {
                    run_current.get().unwrap_or_else(|| run_start.get())
                } else {
                    run_start.get()
                };
                let mut m = run_morph.borrow_mut();
                m.from(from);
                m.to(run_goal.get());
                let out = m.at(pos);
                run_current.set(Some(out));
                cx.add_transform(&out);
                cx.register_transform_runner();
                m.done()
            })),
            Some(Box::new(move |target: &Value| {
                if let Value::Matrix(m) = target {
                    retarget_goal.set(*m);
                }
            })),
            true,
        );
        if self.is_declarative() {
            self.remember("transform", morph);
        }
        self
    }
}
