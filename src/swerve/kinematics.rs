// Swerve inverse kinematics for the four-module base
// Converts a chassis command (translation, rotation, heading compensation) into one target
// vector per module.

use crate::config::ChassisRevision;

use super::vector::Vector2;

/// Number of swerve modules on the base
pub const MODULE_COUNT: usize = 4;

/// Perpendicular rotation constants (before normalization to a unit vector)
const X_PERPENDICULAR: f64 = 0.546;
const Y_PERPENDICULAR: f64 = 0.837;

/// Corner sign pattern for the rotation term, modules 0..3
/// front-left (+,-), front-right (-,-), rear-right (-,+), rear-left (+,+)
const CORNER_SIGNS: [(f64, f64); MODULE_COUNT] = [(1.0, -1.0), (-1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];

/// Mechanical zero offsets (degrees) per chassis revision
const ALPHA_ANGLE_OFFSETS: [f64; MODULE_COUNT] = [6.0, 161.0, -66.5, 128.0];
const BETA_ANGLE_OFFSETS: [f64; MODULE_COUNT] = [-2.0, 133.0, -15.0, -145.0];

/// Modules whose steering encoder and drive motor run mirrored
const MODULE_REVERSED: [bool; MODULE_COUNT] = [false, false, true, true];

/// Immutable chassis constants
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrivetrainGeometry {
    /// (kx, ky) rotation constants per module, unit length
    pub perpendicular: [(f64, f64); MODULE_COUNT],
    /// Mechanical zero offset per module, degrees
    pub angle_offsets: [f64; MODULE_COUNT],
    pub reversed: [bool; MODULE_COUNT],
}

impl DrivetrainGeometry {
    /// Constants for a given chassis revision
    pub fn for_revision(revision: ChassisRevision) -> Self {
        let angle_offsets = match revision {
            ChassisRevision::Alpha => ALPHA_ANGLE_OFFSETS,
            ChassisRevision::Beta => BETA_ANGLE_OFFSETS,
        };
        let perpendicular = unit_perpendicular(X_PERPENDICULAR, Y_PERPENDICULAR);
        Self {
            perpendicular: [perpendicular; MODULE_COUNT],
            angle_offsets,
            reversed: MODULE_REVERSED,
        }
    }
}

fn unit_perpendicular(x: f64, y: f64) -> (f64, f64) {
    let len = x.hypot(y);
    (x / len, y / len)
}

/// Compute the four module target vectors
///
/// # Arguments
/// * `translation` - Chassis translation, magnitude <= 1
/// * `rotation` - Rotation amount in [-1, 1]
/// * `heading_compensation` - Chassis heading in degrees for field-centric drive, 0 for robot-centric
///
/// # Returns
/// Target vector per module, each with magnitude <= 1
pub fn module_vectors(
    geometry: &DrivetrainGeometry,
    translation: Vector2,
    rotation: f64,
    heading_compensation: f64,
) -> [Vector2; MODULE_COUNT] {
    let translation = translation.rotated(-heading_compensation);

    let mut vectors = [Vector2::zero(); MODULE_COUNT];
    for (i, vector) in vectors.iter_mut().enumerate() {
        let (kx, ky) = geometry.perpendicular[i];
        let (sx, sy) = CORNER_SIGNS[i];
        *vector = translation + Vector2::new(sx * rotation * kx, sy * rotation * ky);
    }

    // Scale uniformly so module ratios (and the turn center) are preserved
    let max_magnitude = vectors
        .iter()
        .map(Vector2::magnitude)
        .fold(0.0f64, f64::max);

    if max_magnitude > 1.0 {
        let scale = 1.0 / max_magnitude;
        for vector in &mut vectors {
            vector.scale_magnitude(scale);
        }
    }

    vectors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alpha() -> DrivetrainGeometry {
        DrivetrainGeometry::for_revision(ChassisRevision::Alpha)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_zero_command() {
        let vectors = module_vectors(&alpha(), Vector2::zero(), 0.0, 0.0);
        for v in vectors {
            assert_eq!(v.magnitude(), 0.0);
        }
    }

    #[test]
    fn test_pure_strafe() {
        let vectors = module_vectors(&alpha(), Vector2::new(1.0, 0.0), 0.0, 0.0);
        for v in vectors {
            assert!(close(v.x(), 1.0), "x = {}", v.x());
            assert!(close(v.y(), 0.0), "y = {}", v.y());
        }
    }

    #[test]
    fn test_pure_rotation_is_symmetric() {
        let vectors = module_vectors(&alpha(), Vector2::zero(), 1.0, 0.0);
        let max = vectors.iter().map(Vector2::magnitude).fold(0.0, f64::max);
        assert!(close(max, 1.0), "max magnitude {}", max);

        for v in &vectors {
            assert!(close(v.magnitude(), vectors[0].magnitude()));
        }

        // Opposite corners point opposite ways
        assert!(close(vectors[0].x(), -vectors[2].x()));
        assert!(close(vectors[0].y(), -vectors[2].y()));
        assert!(close(vectors[1].x(), -vectors[3].x()));
        assert!(close(vectors[1].y(), -vectors[3].y()));
    }

    #[test]
    fn test_combined_command_is_normalized_uniformly() {
        let translation = Vector2::new(1.0, 0.0);
        let vectors = module_vectors(&alpha(), translation, 1.0, 0.0);
        let raw: Vec<Vector2> = (0..MODULE_COUNT)
            .map(|i| {
                let (kx, ky) = alpha().perpendicular[i];
                let (sx, sy) = CORNER_SIGNS[i];
                translation + Vector2::new(sx * kx, sy * ky)
            })
            .collect();

        let max = vectors.iter().map(Vector2::magnitude).fold(0.0, f64::max);
        assert!(close(max, 1.0));

        // Every module shrinks by the same factor
        let ratio = vectors[0].magnitude() / raw[0].magnitude();
        for i in 0..MODULE_COUNT {
            assert!(close(vectors[i].magnitude() / raw[i].magnitude(), ratio));
            assert!(close(vectors[i].angle(), raw[i].angle()));
        }
    }

    #[test]
    fn test_field_centric_compensation() {
        // Robot facing 90°: a field "+x" request becomes robot "-y"
        let vectors = module_vectors(&alpha(), Vector2::new(1.0, 0.0), 0.0, 90.0);
        for v in vectors {
            assert!(close(v.x(), 0.0));
            assert!(close(v.y(), -1.0));
        }
    }

    #[test]
    fn test_revisions_differ_only_in_offsets() {
        let a = DrivetrainGeometry::for_revision(ChassisRevision::Alpha);
        let b = DrivetrainGeometry::for_revision(ChassisRevision::Beta);
        assert_eq!(a.perpendicular, b.perpendicular);
        assert_eq!(a.reversed, b.reversed);
        assert_eq!(b.angle_offsets, [-2.0, 133.0, -15.0, -145.0]);
        assert_ne!(a.angle_offsets, b.angle_offsets);
    }
}
