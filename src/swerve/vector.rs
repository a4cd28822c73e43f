// Planar vector used for chassis translation and module targets
//
// Stored as cartesian components; polar form is computed on demand.
// Angles are in degrees, counter-clockwise from +x.

use serde::{Deserialize, Serialize};

use super::angle::normalize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2 {
    x: f64,
    y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Build from an angle in degrees and a magnitude
    pub fn from_polar(angle: f64, magnitude: f64) -> Self {
        let rad = angle.to_radians();
        Self {
            x: magnitude * rad.cos(),
            y: magnitude * rad.sin(),
        }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn x(&self) -> f64 {
        self.x
    }

    pub fn y(&self) -> f64 {
        self.y
    }

    pub fn magnitude(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Direction in canonical `[0, 360)` degrees. The zero vector reports 0.
    pub fn angle(&self) -> f64 {
        normalize(self.y.atan2(self.x).to_degrees())
    }

    /// Rotate counter-clockwise by `by` degrees
    pub fn rotate(&mut self, by: f64) {
        let (sin, cos) = by.to_radians().sin_cos();
        let x = self.x * cos - self.y * sin;
        let y = self.x * sin + self.y * cos;
        self.x = x;
        self.y = y;
    }

    /// Rotated copy
    pub fn rotated(mut self, by: f64) -> Self {
        self.rotate(by);
        self
    }

    pub fn scale_magnitude(&mut self, factor: f64) {
        self.x *= factor;
        self.y *= factor;
    }
}

impl std::ops::Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}
