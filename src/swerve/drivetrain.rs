// Drivetrain coordinator
//
// Holds the four module controllers and the heading sensor. Every drive mode goes
// kinematics -> per-module optimizer -> position loop + drive output, once per tick.

use tracing::{info, warn};

use crate::config::{ChassisRevision, DriveConfig};
use crate::messages::DrivetrainTelemetry;

use super::angle::normalize;
use super::hardware::{HeadingSensor, ModuleIo};
use super::kinematics::{DrivetrainGeometry, MODULE_COUNT, module_vectors};
use super::module::{CalibrationState, ModuleController, ModuleSettings};
use super::vector::Vector2;

/// Power scale step used by `cycle_power_scale`
const POWER_SCALE_STEP: f64 = 0.1;

pub struct Drivetrain<M: ModuleIo, G: HeadingSensor> {
    modules: [ModuleController<M>; MODULE_COUNT],
    heading_sensor: G,
    geometry: DrivetrainGeometry,
    /// Tick period, seconds
    dt: f64,
    power_scale: f64,
    indexing: bool,
}

impl<M: ModuleIo, G: HeadingSensor> Drivetrain<M, G> {
    /// Build with the geometry of the configured chassis revision.
    /// `hardware` is ordered front-left, front-right, rear-right, rear-left.
    pub fn new(config: &DriveConfig, hardware: [M; MODULE_COUNT], heading_sensor: G) -> Self {
        let geometry = DrivetrainGeometry::for_revision(config.chassis);
        Self::with_geometry(config, geometry, hardware, heading_sensor)
    }

    pub fn with_geometry(
        config: &DriveConfig,
        geometry: DrivetrainGeometry,
        hardware: [M; MODULE_COUNT],
        heading_sensor: G,
    ) -> Self {
        let initial = if config.trust_encoders {
            CalibrationState::Referenced
        } else {
            CalibrationState::Seeking
        };

        let mut id = 0;
        let modules = hardware.map(|io| {
            let module = ModuleController::new(
                id,
                io,
                ModuleSettings::from_config(config, geometry.reversed[id]),
                &config.steering,
                geometry.angle_offsets[id],
                initial,
            );
            id += 1;
            module
        });

        info!(
            "Swerve drivetrain initialized: {} chassis, modules {:?}",
            match config.chassis {
                ChassisRevision::Alpha => "alpha",
                ChassisRevision::Beta => "beta",
            },
            initial
        );

        Self {
            modules,
            heading_sensor,
            geometry,
            dt: config.tick_seconds(),
            power_scale: config.power_scale,
            indexing: false,
        }
    }

    /// Drive relative to the robot's own facing
    pub fn drive_robot_centric(&mut self, translation: Vector2, rotation: f64) {
        self.drive(translation, rotation, 0.0);
    }

    /// Drive relative to the field, compensating for chassis `heading` (degrees)
    pub fn drive_field_centric(&mut self, translation: Vector2, rotation: f64, heading: f64) {
        self.drive(translation, rotation, heading);
    }

    fn drive(&mut self, translation: Vector2, rotation: f64, heading_compensation: f64) {
        let vectors = module_vectors(&self.geometry, translation, rotation, heading_compensation);
        for (module, vector) in self.modules.iter_mut().zip(vectors) {
            if let Err(e) = module.set_vector(vector, self.dt) {
                warn!("{}", e);
            }
        }
    }

    /// Zero all drive outputs; steering holds its last setpoint
    pub fn stop(&mut self) {
        for module in &mut self.modules {
            module.stop(self.dt);
        }
    }

    /// Put every module into `Seeking` and start the lockstep indexing sequence
    pub fn begin_indexing(&mut self) {
        info!("Indexing swerve modules");
        self.indexing = true;
        for module in &mut self.modules {
            module.begin_calibration();
        }
    }

    /// Run one indexing tick on all modules. True once all four are referenced.
    pub fn tick_indexing(&mut self) -> bool {
        let dt = self.dt;
        // Tick every module, even after one reports unfinished
        self.modules
            .iter_mut()
            .fold(true, |done, module| module.tick_calibration(dt) && done)
    }

    /// Leave the indexing sequence, forcing actuators to zero output
    pub fn end_indexing(&mut self) {
        self.indexing = false;
        for module in &mut self.modules {
            module.end_calibration();
        }

        let referenced = self.modules.iter().filter(|m| m.is_referenced()).count();
        if referenced == MODULE_COUNT {
            info!("Swerve drive indexed");
        } else {
            warn!(
                "Indexing ended with {}/{} modules referenced",
                referenced, MODULE_COUNT
            );
        }
    }

    pub fn is_indexing(&self) -> bool {
        self.indexing
    }

    /// True when every module is referenced
    pub fn is_referenced(&self) -> bool {
        self.modules.iter().all(|m| m.is_referenced())
    }

    /// Chassis heading in [0, 360)
    pub fn read_heading(&self) -> f64 {
        normalize(self.heading_sensor.yaw())
    }

    pub fn reset_heading(&mut self) {
        info!("Resetting chassis heading");
        self.heading_sensor.reset();
    }

    pub fn heading_sensor_mut(&mut self) -> &mut G {
        &mut self.heading_sensor
    }

    pub fn power_scale(&self) -> f64 {
        self.power_scale
    }

    /// Step the drive power scale up by 0.1, wrapping back to 0.1 past full power
    pub fn cycle_power_scale(&mut self) -> f64 {
        let tenths = (self.power_scale / POWER_SCALE_STEP).round() + 1.0;
        let mut next = tenths * POWER_SCALE_STEP;
        if next > 1.0 + 1e-9 {
            next = POWER_SCALE_STEP;
        }
        self.power_scale = next;
        for module in &mut self.modules {
            module.set_power_scale(next);
        }
        info!("Drive power scale: {:.1}", next);
        next
    }

    /// Module by position, `None` past the last module
    pub fn module(&self, id: usize) -> Option<&ModuleController<M>> {
        self.modules.get(id)
    }

    pub fn modules(&self) -> &[ModuleController<M>; MODULE_COUNT] {
        &self.modules
    }

    pub fn telemetry(&self) -> DrivetrainTelemetry {
        DrivetrainTelemetry {
            heading: self.read_heading(),
            power_scale: self.power_scale,
            indexing: self.indexing,
            modules: self.modules.iter().map(|m| m.telemetry()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swerve::sim::{SimGyro, SimModule, simulated_modules};

    fn config(trust_encoders: bool) -> DriveConfig {
        DriveConfig {
            trust_encoders,
            ..DriveConfig::default()
        }
    }

    fn drivetrain(trust_encoders: bool) -> Drivetrain<SimModule, SimGyro> {
        let config = config(trust_encoders);
        Drivetrain::new(&config, simulated_modules(&config), SimGyro::default())
    }

    fn referenced_count(dt: &Drivetrain<SimModule, SimGyro>) -> usize {
        dt.modules().iter().filter(|m| m.is_referenced()).count()
    }

    #[test]
    fn test_indexing_completes_only_when_all_modules_reference() {
        let mut drivetrain = drivetrain(false);
        assert_eq!(referenced_count(&drivetrain), 0);

        drivetrain.begin_indexing();
        assert!(drivetrain.is_indexing());

        let mut before = 0;
        let mut finished_at = None;
        for tick in 0..500 {
            let done = drivetrain.tick_indexing();
            let now = referenced_count(&drivetrain);
            if done {
                assert_eq!(now, MODULE_COUNT);
                finished_at = Some(tick);
                break;
            }
            assert!(now < MODULE_COUNT, "all referenced but tick_indexing returned false");
            before = now;
        }

        assert!(finished_at.is_some(), "indexing never finished");
        // The tick that returned true is the one where the last module transitioned
        assert_eq!(before, MODULE_COUNT - 1);

        drivetrain.end_indexing();
        assert!(!drivetrain.is_indexing());
        assert!(drivetrain.is_referenced());
        for module in drivetrain.modules() {
            assert_eq!(module.state().commanded_angle, 0.0);
            assert_eq!(module.io().steer_output(), 0.0);
            assert_eq!(module.io().drive_output(), 0.0);
        }
    }

    #[test]
    fn test_early_module_holds_while_others_seek() {
        let mut drivetrain = drivetrain(false);
        drivetrain.begin_indexing();

        // Module 0 is 6 degrees from its mark; module 1 is 161 degrees away
        for _ in 0..10 {
            drivetrain.tick_indexing();
        }
        assert!(drivetrain.module(0).unwrap().is_referenced());
        assert!(!drivetrain.module(1).unwrap().is_referenced());

        let held = drivetrain.module(0).unwrap().telemetry();
        assert!(held.loop_enabled);
        assert_eq!(held.commanded_angle, 0.0);
        assert_eq!(held.drive_output, 0.0);

        // Still seeking at calibration power
        let seeking = drivetrain.module(1).unwrap().telemetry();
        assert!(!seeking.loop_enabled);
        assert_eq!(seeking.steer_output.abs(), 0.8);
    }

    #[test]
    fn test_interrupted_indexing_is_safe() {
        let mut drivetrain = drivetrain(false);
        drivetrain.begin_indexing();
        drivetrain.tick_indexing();
        drivetrain.end_indexing();

        assert!(!drivetrain.is_referenced());
        for module in drivetrain.modules() {
            assert_eq!(module.io().steer_output(), 0.0);
            assert_eq!(module.io().drive_output(), 0.0);
        }

        // Unreferenced modules stay idle under drive commands
        drivetrain.drive_robot_centric(Vector2::new(1.0, 0.0), 0.0);
        assert_eq!(drivetrain.module(1).unwrap().io().drive_output(), 0.0);
    }

    #[test]
    fn test_robot_centric_strafe() {
        let mut drivetrain = drivetrain(true);
        drivetrain.drive_robot_centric(Vector2::new(1.0, 0.0), 0.0);

        for module in drivetrain.modules() {
            let t = module.telemetry();
            assert!(t.commanded_angle.abs() < 1e-9);
            assert!(!t.invert);
            // Power scale 0.4, reversed modules flip polarity
            let expected = if module.id() >= 2 { -0.4 } else { 0.4 };
            assert!((t.drive_output - expected).abs() < 1e-9, "{:?}", t);
        }
    }

    #[test]
    fn test_field_centric_uses_heading() {
        let mut drivetrain = drivetrain(true);
        drivetrain.heading_sensor_mut().set_yaw(450.0);
        let heading = drivetrain.read_heading();
        assert!((heading - 90.0).abs() < 1e-9);

        drivetrain.drive_field_centric(Vector2::new(1.0, 0.0), 0.0, heading);
        for module in drivetrain.modules() {
            assert!((module.state().commanded_angle - 270.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_stop_zeroes_drive() {
        let mut drivetrain = drivetrain(true);
        drivetrain.drive_robot_centric(Vector2::new(0.0, 1.0), 0.3);
        drivetrain.stop();
        for module in drivetrain.modules() {
            assert_eq!(module.io().drive_output(), 0.0);
            assert!(module.telemetry().loop_enabled);
        }
    }

    #[test]
    fn test_bad_input_is_a_no_op() {
        let mut drivetrain = drivetrain(true);
        drivetrain.drive_robot_centric(Vector2::new(0.5, 0.0), 0.0);
        let before = drivetrain.module(0).unwrap().io().drive_output();

        drivetrain.drive_robot_centric(Vector2::new(f64::NAN, 0.0), 0.0);
        assert_eq!(drivetrain.module(0).unwrap().io().drive_output(), before);
    }

    #[test]
    fn test_module_lookup_is_bounded() {
        let drivetrain = drivetrain(true);
        assert_eq!(drivetrain.module(3).map(|m| m.id()), Some(3));
        assert!(drivetrain.module(MODULE_COUNT).is_none());
    }

    #[test]
    fn test_power_scale_cycles() {
        let mut drivetrain = drivetrain(true);
        assert!((drivetrain.cycle_power_scale() - 0.5).abs() < 1e-9);
        for _ in 0..5 {
            drivetrain.cycle_power_scale();
        }
        assert!((drivetrain.power_scale() - 1.0).abs() < 1e-9);
        assert!((drivetrain.cycle_power_scale() - 0.1).abs() < 1e-9);

        drivetrain.drive_robot_centric(Vector2::new(1.0, 0.0), 0.0);
        assert!((drivetrain.module(0).unwrap().io().drive_output() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_reset_heading_and_telemetry() {
        let mut drivetrain = drivetrain(true);
        drivetrain.heading_sensor_mut().set_yaw(-30.0);
        assert!((drivetrain.read_heading() - 330.0).abs() < 1e-9);
        drivetrain.reset_heading();
        assert_eq!(drivetrain.read_heading(), 0.0);

        let telemetry = drivetrain.telemetry();
        assert_eq!(telemetry.modules.len(), MODULE_COUNT);
        assert!(!telemetry.indexing);
        assert!(
            telemetry
                .modules
                .iter()
                .all(|m| m.calibration == CalibrationState::Referenced)
        );
    }
}
