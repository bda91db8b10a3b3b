//! From→to interpolation over typed values
//!
//! A [`Morph`] blends a captured "from" toward a retargetable "to". Fixed
//! runners feed it a normalized position; declarative runners feed it raw
//! frame deltas and it advances one [`Spring`] per value component.
//!
//! Values are decomposed into flat `f64` components so one engine covers
//! scalars, points, and matrices alike.

use std::cell::RefCell;
use std::rc::Rc;

use motive_core::{Matrix, Point};
use smallvec::SmallVec;

use crate::spring::Spring;
use crate::stepper::Stepper;

/// An animation target value, used by the retargeting protocol where the
/// concrete morph type is erased.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Value {
    Number(f64),
    Point(Point),
    Matrix(Matrix),
}

type Components = SmallVec<[f64; 8]>;

/// A value a morph can blend.
pub trait MorphValue: Clone {
    fn components(&self) -> Components;

    /// Rebuild from components; missing components fall back to defaults so
    /// an empty slice is always valid.
    fn from_components(c: &[f64]) -> Self;

    /// Extract a value of this type from an untyped retarget request.
    fn from_value(v: &Value) -> Option<Self>;
}

impl MorphValue for f64 {
    fn components(&self) -> Components {
        let mut c = Components::new();
        c.push(*self);
        c
    }

    fn from_components(c: &[f64]) -> Self {
        c.first().copied().unwrap_or(0.0)
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl MorphValue for Point {
    fn components(&self) -> Components {
        let mut c = Components::new();
        c.push(self.x);
        c.push(self.y);
        c
    }

    fn from_components(c: &[f64]) -> Self {
        Point::new(
            c.first().copied().unwrap_or(0.0),
            c.get(1).copied().unwrap_or(0.0),
        )
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Point(p) => Some(*p),
            _ => None,
        }
    }
}

impl MorphValue for Matrix {
    fn components(&self) -> Components {
        let mut c = Components::new();
        c.extend_from_slice(&[self.a, self.b, self.c, self.d, self.e, self.f]);
        c
    }

    fn from_components(c: &[f64]) -> Self {
        let id = Matrix::identity();
        Matrix::new(
            c.first().copied().unwrap_or(id.a),
            c.get(1).copied().unwrap_or(id.b),
            c.get(2).copied().unwrap_or(id.c),
            c.get(3).copied().unwrap_or(id.d),
            c.get(4).copied().unwrap_or(id.e),
            c.get(5).copied().unwrap_or(id.f),
        )
    }

    fn from_value(v: &Value) -> Option<Self> {
        match v {
            Value::Matrix(m) => Some(*m),
            _ => None,
        }
    }
}

/// Type-erased retarget entry point, held by a runner's history registry.
pub trait Retarget {
    /// Redirect the in-flight destination. A value of the wrong type is
    /// ignored; the caller degrades to queueing fresh work.
    fn retarget(&mut self, v: &Value);
}

/// A shared, retargetable morpher handle.
pub type MorpherHandle = Rc<RefCell<dyn Retarget>>;

/// A from→to interpolation engine for a single typed value.
pub struct Morph<T: MorphValue> {
    stepper: Stepper,
    from: Option<T>,
    to: Option<T>,
    springs: SmallVec<[Spring; 8]>,
    seeded: bool,
    progress: f64,
}

impl<T: MorphValue> Morph<T> {
    pub fn new(stepper: Stepper) -> Self {
        Self {
            stepper,
            from: None,
            to: None,
            springs: SmallVec::new(),
            seeded: false,
            progress: f64::NAN,
        }
    }

    /// Capture the starting value. Called lazily by queue initializers.
    pub fn from(&mut self, v: T) -> &mut Self {
        self.from = Some(v);
        self
    }

    /// Set or redirect the destination value.
    pub fn to(&mut self, v: T) -> &mut Self {
        self.to = Some(v);
        self
    }

    pub fn target(&self) -> Option<&T> {
        self.to.as_ref()
    }

    /// Evaluate at a normalized position (fixed) or frame delta
    /// (declarative).
    pub fn at(&mut self, pos_or_dt: f64) -> T {
        let to = match (&self.to, &self.from) {
            (Some(t), _) => t.clone(),
            (None, Some(f)) => f.clone(),
            (None, None) => return T::from_components(&[]),
        };
        match self.stepper {
            Stepper::Ease(easing) => {
                self.progress = pos_or_dt;
                let eased = easing.apply(pos_or_dt);
                let from = self.from.clone().unwrap_or_else(|| to.clone());
                let fc = from.components();
                let tc = to.components();
                let out: Components = fc
                    .iter()
                    .zip(tc.iter())
                    .map(|(a, b)| a + (b - a) * eased)
                    .collect();
                T::from_components(&out)
            }
            Stepper::Spring(config) => {
                if !self.seeded {
                    let from = self.from.clone().unwrap_or_else(|| to.clone());
                    self.springs = from
                        .components()
                        .iter()
                        .map(|c| Spring::new(config, *c))
                        .collect();
                    self.seeded = true;
                }
                let tc = to.components();
                let out: Components = self
                    .springs
                    .iter_mut()
                    .zip(tc.iter())
                    .map(|(s, t)| {
                        s.set_target(*t);
                        s.step(pos_or_dt)
                    })
                    .collect();
                T::from_components(&out)
            }
        }
    }

    /// Convergence: position reached 1 for eased morphs, every component
    /// spring settled for declarative ones.
    pub fn done(&self) -> bool {
        match self.stepper {
            Stepper::Ease(_) => self.progress >= 1.0,
            Stepper::Spring(_) => self.seeded && self.springs.iter().all(Spring::is_settled),
        }
    }
}

impl<T: MorphValue> Retarget for Morph<T> {
    fn retarget(&mut self, v: &Value) {
        if let Some(t) = T::from_value(v) {
            self.to(t);
        }
    }
}
