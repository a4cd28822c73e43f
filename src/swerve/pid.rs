// PID position loop on a circular domain
// Error is the shortest signed angular difference between setpoint and measurement, and the
// derivative uses the same wrap-aware difference between samples, so 359 -> 1 is a 2 degree move.

use crate::config::SteeringGains;

use super::angle::{normalize, shortest_diff};

/// Continuous-input PID with output clamping and integral anti-windup.
#[derive(Debug, Clone)]
pub struct ContinuousPid {
    kp: f64,
    ki: f64,
    kd: f64,

    setpoint: f64,
    enabled: bool,

    /// Integrator state
    integral: f64,
    /// Last measurement (for derivative term)
    prev_measurement: f64,
    first_update: bool,

    out_min: f64,
    out_max: f64,
}

impl ContinuousPid {
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            enabled: true,
            integral: 0.0,
            prev_measurement: 0.0,
            first_update: true,
            out_min: -1.0,
            out_max: 1.0,
        }
    }

    pub fn from_gains(gains: &SteeringGains) -> Self {
        Self::new(gains.kp, gains.ki, gains.kd)
            .with_output_limits(-gains.output_limit, gains.output_limit)
    }

    pub fn with_output_limits(mut self, min: f64, max: f64) -> Self {
        self.out_min = min;
        self.out_max = max;
        self
    }

    /// Setpoint in degrees, stored canonicalized
    pub fn set_setpoint(&mut self, setpoint: f64) {
        self.setpoint = normalize(setpoint);
    }

    pub fn setpoint(&self) -> f64 {
        self.setpoint
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Disable the loop; `update` returns 0 until re-enabled
    pub fn disable(&mut self) {
        self.enabled = false;
        self.reset();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Reset integrator + derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_measurement = 0.0;
        self.first_update = true;
    }

    /// Wrap-aware error between the setpoint and `measurement`
    pub fn error(&self, measurement: f64) -> f64 {
        shortest_diff(self.setpoint, measurement)
    }

    /// Run one step. `measurement` in degrees (any range), `dt` in seconds.
    pub fn update(&mut self, measurement: f64, dt: f64) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let measurement = normalize(measurement);
        let error = self.error(measurement);

        let p = self.kp * error;

        // Anti-windup: the integral alone never exceeds the output range
        if self.ki != 0.0 {
            self.integral += error * dt * self.ki;
            self.integral = self.integral.clamp(self.out_min, self.out_max);
        }

        let d = if self.first_update || dt <= 0.0 {
            0.0
        } else {
            self.kd * shortest_diff(self.prev_measurement, measurement) / dt
        };
        self.first_update = false;
        self.prev_measurement = measurement;

        (p + self.integral + d).clamp(self.out_min, self.out_max)
    }
}
