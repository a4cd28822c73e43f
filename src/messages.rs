// Define message types for the runtime

use serde::{Deserialize, Serialize};

use crate::swerve::CalibrationState;
use crate::swerve::Vector2;

// Chassis command from teleop/scripts -> runtime
// Translation is dimensionless (magnitude <= 1), rotation in [-1, 1]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriveCommand {
    pub translation_x: f64,
    pub translation_y: f64,
    pub rotation: f64,
    #[serde(default)]
    pub field_centric: bool,
}

impl DriveCommand {
    pub fn translation(&self) -> Vector2 {
        Vector2::new(self.translation_x, self.translation_y)
    }
}

// One-shot requests from teleop/scripts -> runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlCommand {
    /// Start the module indexing sequence
    Index,
    /// Abort indexing, leaving unfinished modules seeking
    CancelIndex,
    /// Zero drive output until the next drive command
    Stop,
    /// Make the current chassis heading read zero
    ResetHeading,
    /// Step the drive power scale up by 0.1, wrapping to 0.1
    CyclePowerScale,
}

/// Snapshot of one module, published every tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModuleTelemetry {
    pub id: usize,
    /// Measured heading, module frame, degrees
    pub heading: f64,
    pub commanded_angle: f64,
    /// Position loop setpoint, encoder frame, degrees
    pub setpoint: f64,
    pub steer_output: f64,
    pub drive_output: f64,
    pub invert: bool,
    pub calibration: CalibrationState,
    pub loop_enabled: bool,
    pub at_reference: bool,
    pub index_count: i64,
}

/// Snapshot of the whole drivetrain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainTelemetry {
    pub heading: f64,
    pub power_scale: f64,
    pub indexing: bool,
    pub modules: Vec<ModuleTelemetry>,
}

/// Health status published by runtime
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeHealth {
    Ok,
    CmdStale,
    Indexing,
}
