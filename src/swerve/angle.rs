// Angle math on the circle, in degrees
//
// Every heading the drivetrain stores or uses as a setpoint goes through
// `normalize` first. Comparisons between headings go through `shortest_diff`.

/// Degrees in one full turn
pub const FULL_TURN: f64 = 360.0;

/// Reduce any real value into the canonical range `[0, 360)`
pub fn normalize(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(FULL_TURN);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if wrapped >= FULL_TURN { 0.0 } else { wrapped }
}

/// Signed rotation (degrees) to get from `from` to `to` along the shorter arc.
///
/// Result is in `[-180, 180]`, e.g. `shortest_diff(350.0, 10.0) == -20.0`.
pub fn shortest_diff(to: f64, from: f64) -> f64 {
    let diff = normalize(to - from);
    if diff > 180.0 { diff - FULL_TURN } else { diff }
}

/// Mirror a heading about zero, for modules whose encoder counts the other way
pub fn mirror(angle: f64) -> f64 {
    normalize(FULL_TURN - angle)
}
