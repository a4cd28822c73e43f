// Steering optimizer: keep every steering move within 90 degrees by flipping the wheel
// around and running the drive backwards.

use super::angle::{normalize, shortest_diff};

/// Largest steering move taken before flipping instead
const MAX_STEER_MOVE: f64 = 90.0;

/// Result of one optimizer step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringDecision {
    /// Raw target to remember as the commanded angle for the next call
    pub commanded_angle: f64,
    /// Setpoint for the position loop, with the flip applied
    pub optimized_angle: f64,
    pub invert: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct SteeringOptimizer {
    stationary_threshold: f64,
}

impl SteeringOptimizer {
    pub fn new(stationary_threshold: f64) -> Self {
        Self {
            stationary_threshold,
        }
    }

    /// Decide the steering setpoint and drive sign for a module.
    ///
    /// `commanded_angle` is the last raw target (not the measured heading) so consecutive
    /// calls compose. When `magnitude` is at or below the stationary threshold the previous
    /// heading is kept, so releasing the stick does not snap the wheels back.
    pub fn optimize(
        &self,
        target_angle: f64,
        magnitude: f64,
        commanded_angle: f64,
        invert: bool,
    ) -> SteeringDecision {
        let (commanded_angle, invert) = if magnitude.abs() > self.stationary_threshold {
            let flip = shortest_diff(target_angle, commanded_angle).abs() > MAX_STEER_MOVE;
            (normalize(target_angle), invert ^ flip)
        } else {
            (normalize(commanded_angle), invert)
        };

        let optimized_angle = normalize(commanded_angle + if invert { 180.0 } else { 0.0 });
        SteeringDecision {
            commanded_angle,
            optimized_angle,
            invert,
        }
    }
}

impl Default for SteeringOptimizer {
    fn default() -> Self {
        Self::new(0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_large_turn_flips() {
        let d = SteeringOptimizer::default().optimize(170.0, 1.0, 0.0, false);
        assert!(close(d.optimized_angle, 350.0));
        assert!(d.invert);
        assert!(close(d.commanded_angle, 170.0));
    }

    #[test]
    fn test_small_turn_keeps_direction() {
        let d = SteeringOptimizer::default().optimize(30.0, 1.0, 0.0, false);
        assert!(close(d.optimized_angle, 30.0));
        assert!(!d.invert);
    }

    #[test]
    fn test_exactly_ninety_does_not_flip() {
        let d = SteeringOptimizer::default().optimize(90.0, 1.0, 0.0, false);
        assert!(!d.invert);
        assert!(close(d.optimized_angle, 90.0));
    }

    #[test]
    fn test_steps_compose() {
        let optimizer = SteeringOptimizer::default();
        let first = optimizer.optimize(170.0, 1.0, 0.0, false);

        // Same target again: no further flip
        let second = optimizer.optimize(170.0, 1.0, first.commanded_angle, first.invert);
        assert!(second.invert);
        assert!(close(second.optimized_angle, 350.0));

        // Wheel sits at 350; a target of 10 is a 20 degree move, back to forward drive
        let third = optimizer.optimize(10.0, 1.0, second.commanded_angle, second.invert);
        assert!(!third.invert);
        assert!(close(third.optimized_angle, 10.0));
    }

    #[test]
    fn test_wraparound_target_does_not_flip() {
        let d = SteeringOptimizer::default().optimize(350.0, 1.0, 10.0, false);
        assert!(!d.invert);
        assert!(close(d.optimized_angle, 350.0));
    }

    #[test]
    fn test_stationary_keeps_heading() {
        let optimizer = SteeringOptimizer::default();
        let d = optimizer.optimize(0.0, 0.05, 120.0, true);
        assert!(close(d.commanded_angle, 120.0));
        assert!(d.invert);
        assert!(close(d.optimized_angle, 300.0));
    }
}
