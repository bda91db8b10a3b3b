//! The scene-graph seam
//!
//! An animation never owns the thing it animates. It writes through the
//! [`Target`] trait: named scalar properties plus one transform matrix. The
//! host scene graph decides what a property name means.

use crate::matrix::Matrix;

/// Width/height of a target, used to derive a missing size dimension.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Something a runner can animate.
///
/// Unknown property names are the host's business; a reasonable
/// implementation returns `0.0` for properties it has never stored.
pub trait Target {
    /// Current value of a named property.
    fn get(&self, prop: &str) -> f64;

    /// Write a named property.
    fn set(&mut self, prop: &str, value: f64);

    /// Current transform matrix.
    fn matrix(&self) -> Matrix;

    /// Commit a composed transform matrix.
    fn set_matrix(&mut self, m: Matrix);

    /// Bounding box, consulted when one of two paired size dimensions is
    /// omitted.
    fn bounds(&self) -> Bounds {
        Bounds::default()
    }
}
