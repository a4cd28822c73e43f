// Single swerve module controller
//
// Owns one module's steering position loop, its open-loop drive output, and the
// Seeking -> Referenced calibration state machine. Hardware access goes through `ModuleIo`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{DriveConfig, DriveOutputMode, ReferenceSource, SteeringGains};
use crate::error::{Result, SwerveError};
use crate::messages::ModuleTelemetry;

use super::angle::{mirror, normalize, shortest_diff};
use super::hardware::ModuleIo;
use super::optimizer::SteeringOptimizer;
use super::pid::ContinuousPid;
use super::vector::Vector2;

/// Float slack allowed above unit power after kinematics normalization
const POWER_ROUNDING: f64 = 1e-9;

/// Calibration state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationState {
    /// Heading origin unknown; position loop off
    Seeking,
    /// Encoder zeroed at the mechanical reference
    Referenced,
}

/// Per-module tuning, derived from the drivetrain config
#[derive(Debug, Clone, Copy)]
pub struct ModuleSettings {
    pub reference_source: ReferenceSource,
    pub calibration_power: f64,
    pub power_scale: f64,
    pub output_mode: DriveOutputMode,
    pub max_wheel_speed: f64,
    pub stationary_threshold: f64,
    /// Encoder counts and drive motor run mirrored on this module
    pub reversed: bool,
}

impl ModuleSettings {
    pub fn from_config(config: &DriveConfig, reversed: bool) -> Self {
        Self {
            reference_source: config.reference_source,
            calibration_power: config.calibration_power,
            power_scale: config.power_scale,
            output_mode: config.output_mode,
            max_wheel_speed: config.max_wheel_speed,
            stationary_threshold: config.stationary_threshold,
            reversed,
        }
    }
}

/// Mutable per-module state
#[derive(Debug, Clone, PartialEq)]
pub struct SwerveModuleState {
    pub id: usize,
    /// Measured heading in the module frame
    pub current_heading: f64,
    /// Last raw target handed to the optimizer
    pub commanded_angle: f64,
    pub invert: bool,
    pub calibration: CalibrationState,
    /// Mechanical zero offset
    pub angle_offset: f64,
    /// Index-pulse count at the last sample
    pub last_index_count: i64,
}

/// Seek parameters fixed when a calibration sequence begins
#[derive(Debug, Clone, Copy)]
struct SeekPlan {
    start_index_count: i64,
    direction: f64,
}

pub struct ModuleController<M: ModuleIo> {
    io: M,
    state: SwerveModuleState,
    settings: ModuleSettings,
    optimizer: SteeringOptimizer,
    pid: ContinuousPid,
    seek: Option<SeekPlan>,
    /// Where the reference is expected in the encoder frame
    reference_estimate: f64,
    steer_output: f64,
    drive_output: f64,
}

impl<M: ModuleIo> ModuleController<M> {
    pub fn new(
        id: usize,
        io: M,
        settings: ModuleSettings,
        gains: &SteeringGains,
        angle_offset: f64,
        calibration: CalibrationState,
    ) -> Self {
        let mut controller = Self {
            io,
            state: SwerveModuleState {
                id,
                current_heading: 0.0,
                commanded_angle: 0.0,
                invert: false,
                calibration,
                angle_offset,
                last_index_count: 0,
            },
            settings,
            optimizer: SteeringOptimizer::new(settings.stationary_threshold),
            pid: ContinuousPid::from_gains(gains),
            seek: None,
            reference_estimate: 0.0,
            steer_output: 0.0,
            drive_output: 0.0,
        };

        // Until the first reference, assume the module powered up pointing forward, so the
        // encoder frame is the module frame without the offset applied
        let power_up_reference = normalize(-angle_offset);
        controller.reference_estimate = if settings.reversed {
            mirror(power_up_reference)
        } else {
            power_up_reference
        };
        controller.sample();
        controller.state.last_index_count = controller.io.index_count();

        match calibration {
            CalibrationState::Referenced => controller.command_heading(0.0),
            CalibrationState::Seeking => controller.pid.disable(),
        }
        controller
    }

    pub fn id(&self) -> usize {
        self.state.id
    }

    pub fn state(&self) -> &SwerveModuleState {
        &self.state
    }

    pub fn calibration(&self) -> CalibrationState {
        self.state.calibration
    }

    pub fn is_referenced(&self) -> bool {
        self.state.calibration == CalibrationState::Referenced
    }

    pub fn io(&self) -> &M {
        &self.io
    }

    pub fn io_mut(&mut self) -> &mut M {
        &mut self.io
    }

    pub fn set_power_scale(&mut self, scale: f64) {
        self.settings.power_scale = scale;
    }

    /// Module heading -> position-loop setpoint in the encoder frame
    fn to_encoder_frame(&self, heading: f64) -> f64 {
        let angle = normalize(heading + self.state.angle_offset);
        if self.settings.reversed { mirror(angle) } else { angle }
    }

    /// Encoder reading -> module heading
    fn from_encoder_frame(&self, encoder: f64) -> f64 {
        let angle = if self.settings.reversed { mirror(encoder) } else { normalize(encoder) };
        normalize(angle - self.state.angle_offset)
    }

    /// Read sensors into the module state; returns the encoder angle
    fn sample(&mut self) -> f64 {
        let encoder = normalize(self.io.steering_angle());
        self.state.current_heading = self.from_encoder_frame(encoder);
        self.state.last_index_count = self.io.index_count();
        encoder
    }

    fn write_steer(&mut self, output: f64) {
        self.steer_output = output;
        self.io.set_steer_output(output);
    }

    fn write_drive_zero(&mut self) {
        self.drive_output = 0.0;
        match self.settings.output_mode {
            DriveOutputMode::Power => self.io.set_drive_output(0.0),
            DriveOutputMode::Velocity => self.io.set_drive_velocity(0.0),
        }
    }

    /// Both actuators to zero
    fn idle(&mut self) {
        self.write_steer(0.0);
        self.write_drive_zero();
    }

    /// Point the module at `heading` with forward drive, bypassing the optimizer
    fn command_heading(&mut self, heading: f64) {
        self.state.commanded_angle = normalize(heading);
        self.state.invert = false;
        let setpoint = self.to_encoder_frame(heading);
        self.pid.set_setpoint(setpoint);
    }

    /// One position-loop step toward the current setpoint
    pub fn run_position_loop(&mut self, dt: f64) {
        let encoder = self.sample();
        let output = self.pid.update(encoder, dt);
        self.write_steer(output);
    }

    /// Apply a kinematics target: optimize, update the steering loop, write drive power.
    ///
    /// A `Seeking` module has no heading origin, so it is held idle instead. An out-of-range
    /// magnitude is rejected before any state or output changes.
    pub fn set_vector(&mut self, target: Vector2, dt: f64) -> Result<()> {
        if !self.is_referenced() {
            debug!("Module {} not referenced, holding idle", self.state.id);
            self.idle();
            return Ok(());
        }

        let magnitude = target.magnitude();
        self.check_power(magnitude)?;
        let decision = self.optimizer.optimize(
            target.angle(),
            magnitude,
            self.state.commanded_angle,
            self.state.invert,
        );
        self.state.commanded_angle = decision.commanded_angle;
        self.state.invert = decision.invert;
        let setpoint = self.to_encoder_frame(decision.optimized_angle);
        self.pid.set_setpoint(setpoint);

        self.run_position_loop(dt);
        self.set_power(magnitude)
    }

    fn check_power(&self, power: f64) -> Result<()> {
        if power.abs() <= 1.0 + POWER_ROUNDING {
            Ok(())
        } else {
            Err(SwerveError::PowerOutOfRange {
                module: self.state.id,
                power,
            })
        }
    }

    /// Write open-loop drive power in [-1, 1]. Out-of-range power is rejected, never clamped.
    /// A `Seeking` module keeps its drive at zero.
    pub fn set_power(&mut self, power: f64) -> Result<()> {
        self.check_power(power)?;
        if !self.is_referenced() {
            self.write_drive_zero();
            return Ok(());
        }
        let power = power.clamp(-1.0, 1.0);

        let mut signed = if self.state.invert { -power } else { power };
        if self.settings.reversed {
            signed = -signed;
        }

        match self.settings.output_mode {
            DriveOutputMode::Power => {
                self.drive_output = signed * self.settings.power_scale;
                self.io.set_drive_output(self.drive_output);
            }
            DriveOutputMode::Velocity => {
                self.drive_output = signed * self.settings.max_wheel_speed;
                self.io.set_drive_velocity(self.drive_output);
            }
        }
        Ok(())
    }

    /// Zero drive, keep steering where it is
    pub fn stop(&mut self, dt: f64) {
        self.write_drive_zero();
        if self.is_referenced() {
            self.run_position_loop(dt);
        } else {
            self.write_steer(0.0);
        }
    }

    /// Enter `Seeking` and fix the seek direction for this sequence
    pub fn begin_calibration(&mut self) {
        self.state.calibration = CalibrationState::Seeking;
        self.pid.disable();
        self.idle();

        let encoder = self.sample();
        let distance = shortest_diff(self.reference_estimate, encoder);
        let direction = if distance < 0.0 { -1.0 } else { 1.0 };
        self.seek = Some(SeekPlan {
            start_index_count: self.state.last_index_count,
            direction,
        });
        info!(
            "Module {}: {:.1} deg to last known reference, seeking {}",
            self.state.id,
            distance,
            if direction > 0.0 { "forward" } else { "backward" }
        );
    }

    /// One calibration tick. Returns true once the module is referenced.
    ///
    /// Referenced modules hold heading zero while the rest of the drivetrain finishes.
    pub fn tick_calibration(&mut self, dt: f64) -> bool {
        match self.state.calibration {
            CalibrationState::Referenced => {
                self.write_drive_zero();
                self.run_position_loop(dt);
                true
            }
            CalibrationState::Seeking => {
                self.sample();
                let Some(plan) = self.seek else {
                    self.idle();
                    return false;
                };
                if self.reference_reached(&plan) {
                    self.mark_referenced();
                    true
                } else {
                    self.write_drive_zero();
                    self.write_steer(plan.direction * self.settings.calibration_power);
                    false
                }
            }
        }
    }

    fn reference_reached(&self, plan: &SeekPlan) -> bool {
        match self.settings.reference_source {
            ReferenceSource::IndexPulse => self.state.last_index_count != plan.start_index_count,
            ReferenceSource::HomeSwitch => self.io.at_reference(),
        }
    }

    fn mark_referenced(&mut self) {
        self.io.reset_steering_encoder();
        self.idle();
        self.seek = None;
        self.reference_estimate = 0.0;
        self.state.calibration = CalibrationState::Referenced;
        self.pid.reset();
        self.pid.enable();
        self.command_heading(0.0);
        self.sample();
        info!("Module {} referenced", self.state.id);
    }

    /// Leave the calibration sequence with both actuators at zero
    pub fn end_calibration(&mut self) {
        self.seek = None;
        self.idle();
        if !self.is_referenced() {
            warn!(
                "Module {} left calibration without finding its reference",
                self.state.id
            );
        }
    }

    pub fn telemetry(&self) -> ModuleTelemetry {
        ModuleTelemetry {
            id: self.state.id,
            heading: self.state.current_heading,
            commanded_angle: self.state.commanded_angle,
            setpoint: self.pid.setpoint(),
            steer_output: self.steer_output,
            drive_output: self.drive_output,
            invert: self.state.invert,
            calibration: self.state.calibration,
            loop_enabled: self.pid.is_enabled(),
            at_reference: self.io.at_reference(),
            index_count: self.state.last_index_count,
        }
    }
}
