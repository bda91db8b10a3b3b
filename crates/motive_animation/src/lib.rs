//! Time-driven animation scheduling
//!
//! The pieces, bottom to top:
//!
//! - [`easing`] and [`spring`]: the two ways a value moves, a fixed curve
//!   over a normalized position or a physical spring over frame deltas.
//! - [`morph`]: from→to interpolation over typed values, retargetable while
//!   in flight.
//! - [`runner`]: one animation instance; converts elapsed time into a
//!   playback position (looping, swing, reversal, waits), drives its morph
//!   queue, and owns the retargeting protocol.
//! - [`track`] and [`element`]: per-target bookkeeping of transform
//!   contributions, batched commits, and the merge pass that keeps
//!   long-lived targets from accumulating finished runners.
//! - [`timeline`] and [`frame`]: the shared clock runners are ordered on and
//!   the host-loop seam that delivers frame deltas.
//!
//! ```
//! use motive_animation::{Element, FrameLoop, Runner, Sequencer, Timeline, When};
//! # use motive_core::{Matrix, Target};
//! # #[derive(Default)]
//! # struct Node { x: f64, matrix: Matrix }
//! # impl Target for Node {
//! #     fn get(&self, _: &str) -> f64 { self.x }
//! #     fn set(&mut self, _: &str, v: f64) { self.x = v; }
//! #     fn matrix(&self) -> Matrix { self.matrix }
//! #     fn set_matrix(&mut self, m: Matrix) { self.matrix = m; }
//! # }
//!
//! let frame_loop = FrameLoop::new();
//! let timeline = Timeline::new(&frame_loop);
//! let element = Element::new(Node::default(), &frame_loop);
//!
//! let runner = Runner::new(300.0);
//! runner.borrow_mut().set_element(&element);
//! runner.borrow_mut().x(100.0);
//! timeline.borrow_mut().schedule(&runner, 0.0, When::Now);
//!
//! // the host delivers ticks; here we drive them by hand
//! for _ in 0..30 {
//!     FrameLoop::tick(&frame_loop, 16.0);
//! }
//! assert_eq!(element.borrow().get("x"), 100.0);
//! ```

pub mod easing;
pub mod element;
pub mod frame;
pub mod morph;
pub mod runner;
pub mod spring;
pub mod stepper;
pub mod timeline;
pub mod track;

pub use easing::Easing;
pub use element::{Element, ElementHandle, ElementWeak};
pub use frame::{FrameId, FrameLoop, FrameLoopHandle, TaskId};
pub use morph::{Morph, MorphValue, MorpherHandle, Retarget, Value};
pub use runner::{
    InitFn, JobCx, Options, Persist, RetargetFn, RunFn, Runner, RunnerEvent, RunnerHandle,
    When, DEFAULT_FRAME_MS,
};
pub use spring::{Spring, SpringConfig};
pub use stepper::Stepper;
pub use timeline::{Sequencer, SequencerHandle, SequencerWeak, Timeline, TimelineHandle};

/// Errors surfaced by the scheduling layer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A runner was scheduled with no ordering facility available, neither
    /// passed in nor remembered from an earlier schedule.
    #[error("runner cannot be scheduled without a timeline")]
    NoTimeline,
}
