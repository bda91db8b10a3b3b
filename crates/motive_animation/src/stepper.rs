//! Stepper abstraction
//!
//! A stepper maps a playback input to an eased output. The two variants are
//! resolved once at runner construction and never re-inspected:
//!
//! - [`Stepper::Ease`] consumes a normalized position in `[0, 1]` computed
//!   from elapsed time and a fixed duration.
//! - [`Stepper::Spring`] consumes a raw frame delta and tracks its own
//!   convergence; runners driven by it are *declarative*.

use crate::easing::Easing;
use crate::spring::SpringConfig;

#[derive(Clone, Copy, Debug)]
pub enum Stepper {
    Ease(Easing),
    Spring(SpringConfig),
}

impl Default for Stepper {
    fn default() -> Self {
        Stepper::Ease(Easing::default())
    }
}

impl Stepper {
    /// True for steppers whose completion comes from convergence signals
    /// instead of elapsed duration.
    pub fn is_declarative(&self) -> bool {
        matches!(self, Stepper::Spring(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarative_flag() {
        assert!(!Stepper::Ease(Easing::Linear).is_declarative());
        assert!(Stepper::Spring(SpringConfig::default()).is_declarative());
    }
}
