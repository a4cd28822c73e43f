// 50 Hz swerve loop with watchdog
// Note: a watchdog is a safety mechanism that triggers a safe action if something goes wrong
// Eg. if teleop crashes and stops sending commands, the drivetrain is stopped instead of
// driving on with the last command

use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{info, warn};

// local imports
use crate::config::{
    CMD_TIMEOUT, DriveConfig, LOOP_HZ, TOPIC_CMD_CONTROL, TOPIC_CMD_DRIVE, TOPIC_HEALTH,
    TOPIC_STATE_MODULES,
};
use crate::messages::{ControlCommand, DriveCommand, RuntimeHealth};
use crate::swerve::{Drivetrain, HeadingSensor, ModuleIo, SimGyro, simulated_modules};

pub struct Runtime<M: ModuleIo, G: HeadingSensor> {
    drivetrain: Drivetrain<M, G>,
    latest_cmd: Option<DriveCommand>,
    cmd_received_at: Instant,
    health: RuntimeHealth,
}

impl<M: ModuleIo, G: HeadingSensor> Runtime<M, G> {
    pub fn new(drivetrain: Drivetrain<M, G>) -> Self {
        Self {
            drivetrain,
            latest_cmd: None,
            cmd_received_at: Instant::now(),
            health: RuntimeHealth::CmdStale, // Start stale until first cmd
        }
    }

    pub fn drivetrain(&self) -> &Drivetrain<M, G> {
        &self.drivetrain
    }

    pub fn health(&self) -> RuntimeHealth {
        self.health
    }

    /// Process incoming drive command
    fn on_command(&mut self, cmd: DriveCommand) {
        self.latest_cmd = Some(cmd);
        self.cmd_received_at = Instant::now();
    }

    /// Process incoming one-shot request
    fn on_control(&mut self, cmd: ControlCommand) {
        info!("Received control command: {:?}", cmd);
        match cmd {
            ControlCommand::Index => {
                if !self.drivetrain.is_indexing() {
                    self.drivetrain.begin_indexing();
                }
            }
            ControlCommand::CancelIndex => {
                if self.drivetrain.is_indexing() {
                    self.drivetrain.end_indexing();
                }
            }
            ControlCommand::Stop => {
                if self.drivetrain.is_indexing() {
                    self.drivetrain.end_indexing();
                }
                self.latest_cmd = None;
                self.drivetrain.stop();
            }
            ControlCommand::ResetHeading => self.drivetrain.reset_heading(),
            ControlCommand::CyclePowerScale => {
                self.drivetrain.cycle_power_scale();
            }
        }
    }

    /// Run one control tick (indexing, or driving with watchdog)
    fn tick(&mut self) {
        if self.drivetrain.is_indexing() {
            self.health = RuntimeHealth::Indexing;
            if self.drivetrain.tick_indexing() {
                self.drivetrain.end_indexing();
            }
            return;
        }

        let cmd_age = self.cmd_received_at.elapsed();

        if cmd_age > CMD_TIMEOUT {
            // Watchdog triggered - stop the robot
            if self.health != RuntimeHealth::CmdStale {
                warn!("Command stale ({:?} old), stopping drivetrain", cmd_age);
            }
            self.health = RuntimeHealth::CmdStale;
            self.drivetrain.stop();
        } else if let Some(cmd) = self.latest_cmd {
            self.health = RuntimeHealth::Ok;
            if cmd.field_centric {
                let heading = self.drivetrain.read_heading();
                self.drivetrain
                    .drive_field_centric(cmd.translation(), cmd.rotation, heading);
            } else {
                self.drivetrain
                    .drive_robot_centric(cmd.translation(), cmd.rotation);
            }
        } else {
            // No command since start or last stop
            self.health = RuntimeHealth::CmdStale;
            self.drivetrain.stop();
        }
    }
}

/// Run the runtime against simulated module hardware
pub async fn run(
    config: DriveConfig,
    index_on_start: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Using simulated swerve modules");
    let drivetrain = Drivetrain::new(&config, simulated_modules(&config), SimGyro::default());
    run_with(drivetrain, index_on_start).await
}

/// Run the runtime loop over any module hardware
pub async fn run_with<M: ModuleIo, G: HeadingSensor>(
    drivetrain: Drivetrain<M, G>,
    index_on_start: bool,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;

    info!("Setting up publishers and subscribers...");
    let sub_drive = session.declare_subscriber(TOPIC_CMD_DRIVE).await?;
    let sub_control = session.declare_subscriber(TOPIC_CMD_CONTROL).await?;
    let pub_modules = session.declare_publisher(TOPIC_STATE_MODULES).await?;
    let pub_health = session.declare_publisher(TOPIC_HEALTH).await?;

    let mut runtime = Runtime::new(drivetrain);
    if index_on_start {
        runtime.on_control(ControlCommand::Index);
    }
    let mut tick = interval(Duration::from_millis(1000 / LOOP_HZ));

    info!(
        "Runtime started: {}Hz loop, {}ms watchdog timeout",
        LOOP_HZ,
        CMD_TIMEOUT.as_millis()
    );
    info!("Subscribed to: {}, {}", TOPIC_CMD_DRIVE, TOPIC_CMD_CONTROL);
    info!("Publishing to: {}, {}", TOPIC_STATE_MODULES, TOPIC_HEALTH);

    loop {
        tick.tick().await;

        // 1. Drain all pending commands (non-blocking), keep latest
        while let Ok(Some(sample)) = sub_drive.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<DriveCommand>(&payload) {
                Ok(cmd) => runtime.on_command(cmd),
                Err(e) => warn!("Failed to parse drive command: {}", e),
            }
        }
        while let Ok(Some(sample)) = sub_control.try_recv() {
            let payload = sample.payload().to_bytes();
            match serde_json::from_slice::<ControlCommand>(&payload) {
                Ok(cmd) => runtime.on_control(cmd),
                Err(e) => warn!("Failed to parse control command: {}", e),
            }
        }

        // 2. Drive or index (includes watchdog logic)
        runtime.tick();

        // 3. Publish module telemetry
        let telemetry_json = serde_json::to_string(&runtime.drivetrain.telemetry())?;
        pub_modules.put(telemetry_json).await?;

        // 4. Publish health
        let health_json = serde_json::to_string(&runtime.health)?;
        pub_health.put(health_json).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::swerve::SimModule;

    fn runtime(trust_encoders: bool) -> Runtime<SimModule, SimGyro> {
        let config = DriveConfig {
            trust_encoders,
            ..DriveConfig::default()
        };
        Runtime::new(Drivetrain::new(
            &config,
            simulated_modules(&config),
            SimGyro::default(),
        ))
    }

    fn forward() -> DriveCommand {
        DriveCommand {
            translation_x: 1.0,
            translation_y: 0.0,
            rotation: 0.0,
            field_centric: false,
        }
    }

    #[test]
    fn test_no_command_is_stale() {
        let mut runtime = runtime(true);
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        assert_eq!(runtime.drivetrain().module(0).unwrap().io().drive_output(), 0.0);
    }

    #[test]
    fn test_fresh_command_drives() {
        let mut runtime = runtime(true);
        runtime.on_command(forward());
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::Ok);
        assert!(runtime.drivetrain().module(0).unwrap().io().drive_output() > 0.0);
    }

    #[test]
    fn test_watchdog_stops_stale_command() {
        let mut runtime = runtime(true);
        runtime.on_command(forward());
        runtime.tick();
        std::thread::sleep(CMD_TIMEOUT + Duration::from_millis(50));
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::CmdStale);
        assert_eq!(runtime.drivetrain().module(0).unwrap().io().drive_output(), 0.0);
    }

    #[test]
    fn test_index_request_runs_to_completion() {
        let mut runtime = runtime(false);
        runtime.on_control(ControlCommand::Index);
        runtime.tick();
        assert_eq!(runtime.health(), RuntimeHealth::Indexing);

        for _ in 0..500 {
            if !runtime.drivetrain().is_indexing() {
                break;
            }
            runtime.tick();
        }
        assert!(!runtime.drivetrain().is_indexing());
        assert!(runtime.drivetrain().is_referenced());
    }

    #[test]
    fn test_stop_interrupts_indexing() {
        let mut runtime = runtime(false);
        runtime.on_control(ControlCommand::Index);
        runtime.tick();
        runtime.on_control(ControlCommand::Stop);
        assert!(!runtime.drivetrain().is_indexing());
        assert!(!runtime.drivetrain().is_referenced());
    }
}
