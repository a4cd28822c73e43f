// Swerve drive core for the four-module base
//
// Provides:
// - Angle and vector math on the circle
// - Swerve inverse kinematics (chassis command -> module vectors)
// - Steering optimizer (<= 90 degree moves via drive inversion)
// - Continuous (wraparound) steering position loop
// - Module controller with the reference calibration state machine
// - Drivetrain coordinator and a simulated hardware backend

pub mod angle;
mod drivetrain;
pub mod hardware;
pub mod kinematics;
mod module;
pub mod optimizer;
pub mod pid;
pub mod sim;
pub mod vector;

pub use drivetrain::Drivetrain;
pub use hardware::{HeadingSensor, ModuleIo};
pub use kinematics::{DrivetrainGeometry, MODULE_COUNT, module_vectors};
pub use module::{CalibrationState, ModuleController, ModuleSettings, SwerveModuleState};
pub use optimizer::{SteeringDecision, SteeringOptimizer};
pub use pid::ContinuousPid;
pub use sim::{SimGyro, SimModule, simulated_modules};
pub use vector::Vector2;
