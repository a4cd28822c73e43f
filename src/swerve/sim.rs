// Simulated module hardware for running the runtime and tests without a robot
//
// Steering is a first-order plant: each written output moves the module by
// `output * max_steer_rate * dt`. The quadrature encoder counts the index pulse every time
// the steering passes the mechanical reference, and the home switch reads true within
// `switch_width` degrees of it.

use tracing::debug;

use crate::config::DriveConfig;

use super::angle::{normalize, shortest_diff};
use super::hardware::{HeadingSensor, ModuleIo};
use super::kinematics::{DrivetrainGeometry, MODULE_COUNT};

/// Steering speed at full output, deg/s
pub const DEFAULT_STEER_RATE: f64 = 360.0;
/// Half-width of the home switch window, degrees
pub const DEFAULT_SWITCH_WIDTH: f64 = 4.0;

#[derive(Debug, Clone)]
pub struct SimModule {
    /// Absolute mechanical steering position, degrees
    position: f64,
    /// Mechanical position the encoder was last zeroed at
    encoder_zero: f64,
    /// Mechanical position of the index pulse / home switch
    reference: f64,
    index_count: i64,
    max_steer_rate: f64,
    switch_width: f64,
    dt: f64,

    steer_output: f64,
    drive_output: f64,
    drive_velocity: f64,
}

impl SimModule {
    /// Module starting at `position` with its reference at `reference` (both mechanical degrees)
    pub fn new(position: f64, reference: f64, dt: f64) -> Self {
        Self {
            position: normalize(position),
            encoder_zero: normalize(position),
            reference: normalize(reference),
            index_count: 0,
            max_steer_rate: DEFAULT_STEER_RATE,
            switch_width: DEFAULT_SWITCH_WIDTH,
            dt,
            steer_output: 0.0,
            drive_output: 0.0,
            drive_velocity: 0.0,
        }
    }

    pub fn with_steer_rate(mut self, deg_per_sec: f64) -> Self {
        self.max_steer_rate = deg_per_sec;
        self
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    pub fn steer_output(&self) -> f64 {
        self.steer_output
    }

    pub fn drive_output(&self) -> f64 {
        self.drive_output
    }

    pub fn drive_velocity(&self) -> f64 {
        self.drive_velocity
    }

    /// Advance the plant one tick under `output`
    fn step(&mut self, output: f64) {
        let delta = output.clamp(-1.0, 1.0) * self.max_steer_rate * self.dt;
        if delta == 0.0 {
            return;
        }

        // Did this move sweep across the index mark?
        let to_reference = shortest_diff(self.reference, self.position);
        let crossed = if delta > 0.0 {
            to_reference > 0.0 && to_reference <= delta
        } else {
            to_reference < 0.0 && to_reference >= delta
        };
        if crossed {
            self.index_count += 1;
            debug!("Sim index pulse, count={}", self.index_count);
        }

        self.position = normalize(self.position + delta);
    }
}

impl ModuleIo for SimModule {
    fn steering_angle(&self) -> f64 {
        normalize(self.position - self.encoder_zero)
    }

    fn index_count(&self) -> i64 {
        self.index_count
    }

    fn at_reference(&self) -> bool {
        shortest_diff(self.reference, self.position).abs() <= self.switch_width
    }

    fn reset_steering_encoder(&mut self) {
        self.encoder_zero = self.position;
    }

    fn set_steer_output(&mut self, output: f64) {
        self.steer_output = output;
        self.step(output);
    }

    fn set_drive_output(&mut self, power: f64) {
        self.drive_output = power;
        self.drive_velocity = 0.0;
    }

    fn set_drive_velocity(&mut self, velocity: f64) {
        self.drive_velocity = velocity;
        self.drive_output = 0.0;
    }
}

/// One sim per module, powered up pointing forward with the index mark where the
/// configured chassis expects it
pub fn simulated_modules(config: &DriveConfig) -> [SimModule; MODULE_COUNT] {
    let geometry = DrivetrainGeometry::for_revision(config.chassis);
    let dt = config.tick_seconds();
    std::array::from_fn(|i| {
        let offset = geometry.angle_offsets[i];
        let reference = if geometry.reversed[i] {
            normalize(offset)
        } else {
            normalize(-offset)
        };
        SimModule::new(0.0, reference, dt)
    })
}

/// Heading sensor with a settable yaw
#[derive(Debug, Clone, Default)]
pub struct SimGyro {
    yaw: f64,
    zero: f64,
}

impl SimGyro {
    pub fn new(yaw: f64) -> Self {
        Self { yaw, zero: 0.0 }
    }

    pub fn set_yaw(&mut self, yaw: f64) {
        self.yaw = yaw;
    }
}

impl HeadingSensor for SimGyro {
    fn yaw(&self) -> f64 {
        self.yaw - self.zero
    }

    fn reset(&mut self) {
        self.zero = self.yaw;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steering_moves_with_output() {
        let mut sim = SimModule::new(0.0, 180.0, 0.02);
        sim.set_steer_output(0.5);
        assert!((sim.steering_angle() - 3.6).abs() < 1e-9);
        sim.set_steer_output(-1.0);
        assert!((sim.steering_angle() - 356.4).abs() < 1e-9);
    }

    #[test]
    fn test_index_pulse_counts_crossings() {
        let mut sim = SimModule::new(350.0, 0.0, 0.02);
        let mut ticks = 0;
        while sim.index_count() == 0 && ticks < 10 {
            sim.set_steer_output(1.0);
            ticks += 1;
        }
        assert_eq!(sim.index_count(), 1);
        assert_eq!(ticks, 2); // 350 -> 357.2 -> 4.4

        // Back across the mark counts again
        sim.set_steer_output(-1.0);
        assert_eq!(sim.index_count(), 2);
    }

    #[test]
    fn test_home_switch_window() {
        let sim = SimModule::new(2.0, 0.0, 0.02);
        assert!(sim.at_reference());
        let sim = SimModule::new(10.0, 0.0, 0.02);
        assert!(!sim.at_reference());
    }

    #[test]
    fn test_encoder_reset() {
        let mut sim = SimModule::new(100.0, 0.0, 0.02);
        sim.set_steer_output(1.0);
        assert!(sim.steering_angle() > 0.0);
        sim.reset_steering_encoder();
        assert_eq!(sim.steering_angle(), 0.0);
    }

    #[test]
    fn test_gyro_reset() {
        let mut gyro = SimGyro::new(42.0);
        assert_eq!(gyro.yaw(), 42.0);
        gyro.reset();
        assert_eq!(gyro.yaw(), 0.0);
        gyro.set_yaw(50.0);
        assert_eq!(gyro.yaw(), 8.0);
    }
}
