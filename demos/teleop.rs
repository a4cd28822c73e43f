// Keyboard teleop: WASD translate, Z/X rotate, R/F speed, C field-centric, Q quit
// One-shots: I index modules, G reset heading, P cycle power scale, Space stop
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use swerve_zenoh_runtime::config::{TOPIC_CMD_CONTROL, TOPIC_CMD_DRIVE};
use swerve_zenoh_runtime::messages::{ControlCommand, DriveCommand};

const SPEEDS: [f64; 3] = [0.25, 0.5, 1.0]; // fraction of full translation
const ROTATION_SPEEDS: [f64; 3] = [0.2, 0.4, 0.8]; // fraction of full rotation
const INPUT_TIMEOUT_MS: u64 = 100; // Reset command after this much time with no input

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_drive = session.declare_publisher(TOPIC_CMD_DRIVE).await?;
    let pub_control = session.declare_publisher(TOPIC_CMD_CONTROL).await?;

    info!("Controls: WASD=move, Z/X=rotate, R/F=speed, C=field-centric, Q=quit");
    info!("          I=index, G=reset heading, P=power scale, Space=stop");
    info!("Speed: LOW, robot-centric");

    enable_raw_mode()?;
    let result = run_teleop(&pub_drive, &pub_control).await;
    disable_raw_mode()?;

    result
}

async fn send_control(
    publisher: &zenoh::pubsub::Publisher<'_>,
    cmd: ControlCommand,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    info!("Sending {:?}", cmd);
    publisher.put(serde_json::to_string(&cmd)?).await?;
    Ok(())
}

async fn run_teleop(
    pub_drive: &zenoh::pubsub::Publisher<'_>,
    pub_control: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut speed_idx: usize = 0;
    let mut cmd = DriveCommand::default();
    let mut last_movement_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;

                match code {
                    // Translation: +y forward, +x right
                    KeyCode::Char('w') if pressed => {
                        cmd.translation_y = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('s') if pressed => {
                        cmd.translation_y = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('a') if pressed => {
                        cmd.translation_x = -SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('d') if pressed => {
                        cmd.translation_x = SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Rotation
                    KeyCode::Char('z') if pressed => {
                        cmd.rotation = ROTATION_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }
                    KeyCode::Char('x') if pressed => {
                        cmd.rotation = -ROTATION_SPEEDS[speed_idx];
                        last_movement_input = Instant::now();
                    }

                    // Speed control
                    KeyCode::Char('r') if pressed => {
                        speed_idx = (speed_idx + 1).min(2);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('f') if pressed => {
                        speed_idx = speed_idx.saturating_sub(1);
                        print_speed(speed_idx);
                    }
                    KeyCode::Char('c') if kind == KeyEventKind::Press => {
                        cmd.field_centric = !cmd.field_centric;
                        info!(
                            "{}",
                            if cmd.field_centric { "Field-centric" } else { "Robot-centric" }
                        );
                    }

                    // One-shots
                    KeyCode::Char('i') if kind == KeyEventKind::Press => {
                        send_control(pub_control, ControlCommand::Index).await?;
                    }
                    KeyCode::Char('g') if kind == KeyEventKind::Press => {
                        send_control(pub_control, ControlCommand::ResetHeading).await?;
                    }
                    KeyCode::Char('p') if kind == KeyEventKind::Press => {
                        send_control(pub_control, ControlCommand::CyclePowerScale).await?;
                    }
                    KeyCode::Char(' ') if kind == KeyEventKind::Press => {
                        send_control(pub_control, ControlCommand::Stop).await?;
                    }

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc if pressed => break,

                    _ => {}
                }
            }
        }

        // Reset motion if no movement input for INPUT_TIMEOUT_MS
        if last_movement_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            cmd.translation_x = 0.0;
            cmd.translation_y = 0.0;
            cmd.rotation = 0.0;
        }

        // Always publish at ~50Hz
        pub_drive.put(serde_json::to_string(&cmd)?).await?;
    }

    Ok(())
}

fn print_speed(idx: usize) {
    let label = ["LOW", "MED", "HIGH"][idx];
    info!("Speed: {}", label);
}
