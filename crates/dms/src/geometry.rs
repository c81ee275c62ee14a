//! Eye openness geometry

use serde::{Deserialize, Serialize};

use crate::landmarks::EyeLandmarks;
use crate::DmsError;

/// 2D landmark coordinate in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "(f32, f32)", into = "(f32, f32)")]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl From<(f32, f32)> for Point2 {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

impl From<Point2> for (f32, f32) {
    fn from(p: Point2) -> Self {
        (p.x, p.y)
    }
}

/// Eye Aspect Ratio of one eye.
///
/// With the points P0..P5 ordered outer corner, two upper-lid points, inner
/// corner, two lower-lid points:
///
/// ```text
/// EAR = (|P1 - P5| + |P2 - P4|) / (2 * |P0 - P3|)
/// ```
///
/// Open eyes sit around 0.3, closed eyes fall towards 0. Fails with
/// [`DmsError::DegenerateGeometry`] when the corners coincide.
pub fn eye_aspect_ratio(eye: &EyeLandmarks) -> Result<f32, DmsError> {
    let p = eye.points();
    let a = p[1].distance(&p[5]);
    let b = p[2].distance(&p[4]);
    let c = p[0].distance(&p[3]);

    if c == 0.0 {
        return Err(DmsError::DegenerateGeometry);
    }

    let ear = (a + b) / (2.0 * c);
    if !ear.is_finite() {
        return Err(DmsError::DegenerateGeometry);
    }
    Ok(ear)
}

/// Combine per-eye readings into one openness value for the face.
///
/// Both readable: mean. One readable: that one. Neither: unknown.
pub fn combined_openness(left: Option<f32>, right: Option<f32>) -> Option<f32> {
    match (left, right) {
        (Some(l), Some(r)) => Some((l + r) / 2.0),
        (Some(v), None) | (None, Some(v)) => Some(v),
        (None, None) => None,
    }
}
