// Offline indexing run: calibrate four simulated modules, then strafe and spin
// No Zenoh session needed. Set RUST_LOG=debug to see index pulses.
use tracing::info;
use tracing_subscriber::EnvFilter;

use swerve_zenoh_runtime::config::{DriveConfig, ReferenceSource};
use swerve_zenoh_runtime::swerve::{Drivetrain, SimGyro, SimModule, Vector2, simulated_modules};

const MAX_TICKS: usize = 500;
const STEER_RATE: f64 = 180.0; // deg/s, slower than default so the seek is visible

fn print_modules(tick: usize, drivetrain: &Drivetrain<SimModule, SimGyro>) {
    let telemetry = drivetrain.telemetry();
    let line: Vec<String> = telemetry
        .modules
        .iter()
        .map(|m| {
            format!(
                "#{} {:>6.1}° {:?} steer={:+.2} drive={:+.2}",
                m.id, m.heading, m.calibration, m.steer_output, m.drive_output
            )
        })
        .collect();
    info!("tick {:>3} | {}", tick, line.join(" | "));
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = DriveConfig {
        reference_source: ReferenceSource::IndexPulse,
        ..DriveConfig::default()
    };
    config.validate()?;

    let hardware = simulated_modules(&config).map(|sim| sim.with_steer_rate(STEER_RATE));
    for (i, sim) in hardware.iter().enumerate() {
        info!("module {}: index mark at {:.1}°", i, sim.reference());
    }

    let mut drivetrain = Drivetrain::new(&config, hardware, SimGyro::default());

    // 1. Indexing
    drivetrain.begin_indexing();
    let mut tick = 0;
    while tick < MAX_TICKS {
        let done = drivetrain.tick_indexing();
        if tick % 5 == 0 || done {
            print_modules(tick, &drivetrain);
        }
        tick += 1;
        if done {
            break;
        }
    }
    drivetrain.end_indexing();

    if !drivetrain.is_referenced() {
        return Err(format!("indexing did not finish in {} ticks", MAX_TICKS).into());
    }

    // 2. Strafe right at half speed
    info!("Strafing right");
    for tick in 0..25 {
        drivetrain.drive_robot_centric(Vector2::new(0.5, 0.0), 0.0);
        if tick % 5 == 0 {
            print_modules(tick, &drivetrain);
        }
    }

    // 3. Spin in place
    info!("Spinning");
    for tick in 0..25 {
        drivetrain.drive_robot_centric(Vector2::zero(), 0.5);
        if tick % 5 == 0 {
            print_modules(tick, &drivetrain);
        }
    }

    drivetrain.stop();
    print_modules(0, &drivetrain);
    for sim in drivetrain.modules().iter().map(|m| m.io()) {
        info!(
            "final mechanical position {:.1}°, reference {:.1}°",
            sim.position(),
            sim.reference()
        );
    }
    Ok(())
}
