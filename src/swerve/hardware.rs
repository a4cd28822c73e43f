// Sensor-read / actuator-write capability a module controller runs against.
//
// Each hardware generation (quadrature encoder with index pulse, home switch, simulated)
// implements these traits; the control logic above them is shared.

/// One module's steering encoder, reference sensor, and two actuators
pub trait ModuleIo {
    /// Steering encoder reading in degrees, any range
    fn steering_angle(&self) -> f64;

    /// Raw index-pulse count from the steering encoder
    fn index_count(&self) -> i64;

    /// Home/limit switch state; true when the module sits at its mechanical zero
    fn at_reference(&self) -> bool;

    /// Zero the relative steering encoder at the current position
    fn reset_steering_encoder(&mut self);

    /// Steering actuator output in [-1, 1]; positive increases the encoder reading
    fn set_steer_output(&mut self, output: f64);

    /// Drive actuator power in [-1, 1]
    fn set_drive_output(&mut self, power: f64);

    /// Drive actuator velocity demand, for controllers with their own speed loop
    fn set_drive_velocity(&mut self, velocity: f64);
}

/// Chassis heading source (IMU / gyro)
pub trait HeadingSensor {
    /// Yaw in degrees, any range
    fn yaw(&self) -> f64;

    /// Make the current heading read as zero
    fn reset(&mut self);
}
