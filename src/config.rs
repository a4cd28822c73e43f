// Timeouts, topics, drivetrain configuration
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SwerveError};

// Runtime loop frequency
pub const LOOP_HZ: u64 = 50;

// Command timeout for watchdog
pub const CMD_TIMEOUT: Duration = Duration::from_millis(250);

// Zenoh topics
pub const TOPIC_CMD_DRIVE: &str = "swerve/cmd/drive"; // chassis commands
pub const TOPIC_CMD_CONTROL: &str = "swerve/cmd/control"; // index, stop, heading reset
pub const TOPIC_STATE_MODULES: &str = "swerve/state/modules"; // module telemetry
pub const TOPIC_HEALTH: &str = "swerve/state/health"; // health status

// Default location of the persisted drivetrain config
pub const DEFAULT_CONFIG_PATH: &str = "swerve.json";

/// Chassis hardware revision. Selects the mechanical angle offset set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ChassisRevision {
    #[default]
    Alpha,
    Beta,
}

/// How a module decides it has reached its mechanical zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceSource {
    /// The encoder index-pulse counter changed since the sequence began
    #[default]
    IndexPulse,
    /// A home/limit switch reports the module is at zero
    HomeSwitch,
}

/// What the drive actuator is sent each tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DriveOutputMode {
    /// Dimensionless power in [-1, 1]
    #[default]
    Power,
    /// Velocity demand, magnitude scaled by `max_wheel_speed`
    Velocity,
}

/// Steering position loop gains and output range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteeringGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    /// Output is clamped to [-output_limit, output_limit]
    pub output_limit: f64,
}

impl Default for SteeringGains {
    fn default() -> Self {
        Self {
            kp: 0.01,
            ki: 0.0,
            kd: 0.0,
            output_limit: 1.0,
        }
    }
}

/// Persisted drivetrain configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    pub chassis: ChassisRevision,
    pub steering: SteeringGains,
    /// Open-loop steering power used while seeking the reference
    pub calibration_power: f64,
    /// Multiplier on every drive output
    pub power_scale: f64,
    /// Drive magnitude at or below which module headings are left alone
    pub stationary_threshold: f64,
    pub output_mode: DriveOutputMode,
    /// Wheel speed for a unit drive magnitude in velocity mode
    pub max_wheel_speed: f64,
    pub reference_source: ReferenceSource,
    /// Start modules as referenced (absolute encoders) instead of seeking
    pub trust_encoders: bool,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            chassis: ChassisRevision::Alpha,
            steering: SteeringGains::default(),
            calibration_power: 0.8,
            power_scale: 0.4,
            stationary_threshold: 0.1,
            output_mode: DriveOutputMode::Power,
            max_wheel_speed: 3.0,
            reference_source: ReferenceSource::IndexPulse,
            trust_encoders: false,
        }
    }
}

impl DriveConfig {
    /// Load and validate a JSON config file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: DriveConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the config if the file exists, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Period of one control tick in seconds
    pub fn tick_seconds(&self) -> f64 {
        1.0 / LOOP_HZ as f64
    }

    pub fn validate(&self) -> Result<()> {
        let gains = &self.steering;
        if ![gains.kp, gains.ki, gains.kd].iter().all(|g| g.is_finite()) {
            return Err(SwerveError::InvalidConfig(
                "steering gains must be finite".to_string(),
            ));
        }
        if !(gains.output_limit > 0.0 && gains.output_limit <= 1.0) {
            return Err(SwerveError::InvalidConfig(format!(
                "steering output_limit {} must be in (0, 1]",
                gains.output_limit
            )));
        }
        if !(self.calibration_power > 0.0 && self.calibration_power <= 1.0) {
            return Err(SwerveError::InvalidConfig(format!(
                "calibration_power {} must be in (0, 1]",
                self.calibration_power
            )));
        }
        if !(self.power_scale > 0.0 && self.power_scale <= 1.0) {
            return Err(SwerveError::InvalidConfig(format!(
                "power_scale {} must be in (0, 1]",
                self.power_scale
            )));
        }
        if !(self.stationary_threshold >= 0.0 && self.stationary_threshold < 1.0) {
            return Err(SwerveError::InvalidConfig(format!(
                "stationary_threshold {} must be in [0, 1)",
                self.stationary_threshold
            )));
        }
        if !(self.max_wheel_speed.is_finite() && self.max_wheel_speed > 0.0) {
            return Err(SwerveError::InvalidConfig(format!(
                "max_wheel_speed {} must be positive",
                self.max_wheel_speed
            )));
        }
        Ok(())
    }
}
