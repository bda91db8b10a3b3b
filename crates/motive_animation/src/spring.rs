//! Spring physics for declarative animations
//!
//! A [`Spring`] tracks one scalar value toward a retargetable goal and knows
//! when it has converged. Declarative runners drive one spring per value
//! component instead of sampling an easing curve at a fixed-duration
//! position.

/// Physical parameters for a spring.
#[derive(Clone, Copy, Debug)]
pub struct SpringConfig {
    /// Restoring force per unit of displacement.
    pub stiffness: f64,
    /// Velocity damping; higher settles faster with less overshoot.
    pub damping: f64,
    pub mass: f64,
    /// Convergence threshold for both displacement and velocity.
    pub epsilon: f64,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 170.0,
            damping: 26.0,
            mass: 1.0,
            epsilon: 1e-3,
        }
    }
}

impl SpringConfig {
    pub fn with_stiffness(mut self, stiffness: f64) -> Self {
        self.stiffness = stiffness;
        self
    }

    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_mass(mut self, mass: f64) -> Self {
        self.mass = mass;
        self
    }
}

/// Integration sub-step ceiling, in milliseconds. Large frame deltas are
/// split so the integration stays stable.
const MAX_SUBSTEP_MS: f64 = 4.0;

/// A scalar spring with its own position, velocity, and goal.
#[derive(Clone, Copy, Debug)]
pub struct Spring {
    config: SpringConfig,
    value: f64,
    velocity: f64,
    target: f64,
}

impl Spring {
    /// Create a spring at rest on `value`.
    pub fn new(config: SpringConfig, value: f64) -> Self {
        Self {
            config,
            value,
            velocity: 0.0,
            target: value,
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// Redirect the spring without resetting position or velocity.
    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Advance by a frame delta in milliseconds and return the new value.
    ///
    /// A non-finite delta snaps the spring onto its target; that is what a
    /// forced `finish()` steps with.
    pub fn step(&mut self, dt_ms: f64) -> f64 {
        if !dt_ms.is_finite() {
            self.value = self.target;
            self.velocity = 0.0;
            return self.value;
        }
        let mut remaining = dt_ms.max(0.0);
        while remaining > 0.0 {
            let h = remaining.min(MAX_SUBSTEP_MS) / 1000.0;
            let displacement = self.target - self.value;
            let accel = (self.config.stiffness * displacement
                - self.config.damping * self.velocity)
                / self.config.mass;
            self.velocity += accel * h;
            self.value += self.velocity * h;
            remaining -= MAX_SUBSTEP_MS;
        }
        self.value
    }

    /// True once displacement and velocity are both inside epsilon.
    pub fn is_settled(&self) -> bool {
        (self.target - self.value).abs() <= self.config.epsilon
            && self.velocity.abs() <= self.config.epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spring_converges() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0);
        spring.set_target(100.0);
        for _ in 0..600 {
            spring.step(16.0);
        }
        assert!(spring.is_settled());
        assert!((spring.value() - 100.0).abs() < 1e-2);
    }

    #[test]
    fn test_spring_at_rest_is_settled() {
        let spring = Spring::new(SpringConfig::default(), 5.0);
        assert!(spring.is_settled());
    }

    #[test]
    fn test_infinite_delta_snaps_to_target() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0);
        spring.set_target(40.0);
        spring.step(f64::INFINITY);
        assert_eq!(spring.value(), 40.0);
        assert!(spring.is_settled());
    }

    #[test]
    fn test_retarget_keeps_state() {
        let mut spring = Spring::new(SpringConfig::default(), 0.0);
        spring.set_target(10.0);
        spring.step(16.0);
        let moving = spring.value();
        assert!(moving > 0.0);
        spring.set_target(-10.0);
        assert_eq!(spring.value(), moving);
        assert!(!spring.is_settled());
    }
}
