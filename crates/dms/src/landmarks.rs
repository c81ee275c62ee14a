//! Facial landmark layout (68-point annotation scheme)

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::geometry::Point2;
use crate::DmsError;

/// Number of points the landmark model returns per face
pub const FACE_LANDMARK_COUNT: usize = 68;

/// Points per eye contour
pub const EYE_LANDMARK_COUNT: usize = 6;

/// Right eye contour indices (subject's right, image left)
pub const RIGHT_EYE: Range<usize> = 36..42;

/// Left eye contour indices
pub const LEFT_EYE: Range<usize> = 42..48;

/// Six ordered points around one eye: outer corner, two upper-lid points,
/// inner corner, two lower-lid points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EyeLandmarks {
    points: [Point2; EYE_LANDMARK_COUNT],
}

impl EyeLandmarks {
    pub fn new(points: [Point2; EYE_LANDMARK_COUNT]) -> Self {
        Self { points }
    }

    /// Build from a slice, which must hold exactly six points
    pub fn from_slice(points: &[Point2]) -> Result<Self, DmsError> {
        let points: [Point2; EYE_LANDMARK_COUNT] =
            points.try_into().map_err(|_| DmsError::LandmarkCount {
                expected: EYE_LANDMARK_COUNT,
                actual: points.len(),
            })?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point2; EYE_LANDMARK_COUNT] {
        &self.points
    }
}

/// Full set of facial landmarks for one detected face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2>", into = "Vec<Point2>")]
pub struct FaceLandmarks {
    points: Vec<Point2>,
}

impl FaceLandmarks {
    pub fn from_points(points: Vec<Point2>) -> Result<Self, DmsError> {
        if points.len() != FACE_LANDMARK_COUNT {
            return Err(DmsError::LandmarkCount {
                expected: FACE_LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn left_eye(&self) -> EyeLandmarks {
        self.eye(LEFT_EYE)
    }

    pub fn right_eye(&self) -> EyeLandmarks {
        self.eye(RIGHT_EYE)
    }

    fn eye(&self, range: Range<usize>) -> EyeLandmarks {
        let mut points = [Point2::default(); EYE_LANDMARK_COUNT];
        points.copy_from_slice(&self.points[range]);
        EyeLandmarks::new(points)
    }
}

impl TryFrom<Vec<Point2>> for FaceLandmarks {
    type Error = DmsError;

    fn try_from(points: Vec<Point2>) -> Result<Self, Self::Error> {
        Self::from_points(points)
    }
}

impl From<FaceLandmarks> for Vec<Point2> {
    fn from(face: FaceLandmarks) -> Self {
        face.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_face() -> FaceLandmarks {
        let points = (0..FACE_LANDMARK_COUNT)
            .map(|i| Point2::new(i as f32, 0.0))
            .collect();
        FaceLandmarks::from_points(points).unwrap()
    }

    #[test]
    fn test_eye_ranges() {
        let face = numbered_face();
        let left: Vec<f32> = face.left_eye().points().iter().map(|p| p.x).collect();
        let right: Vec<f32> = face.right_eye().points().iter().map(|p| p.x).collect();
        assert_eq!(left, vec![42.0, 43.0, 44.0, 45.0, 46.0, 47.0]);
        assert_eq!(right, vec![36.0, 37.0, 38.0, 39.0, 40.0, 41.0]);
    }

    #[test]
    fn test_wrong_point_count() {
        let err = FaceLandmarks::from_points(vec![Point2::default(); 5]).unwrap_err();
        assert!(matches!(err, DmsError::LandmarkCount { expected: 68, actual: 5 }));

        let err = EyeLandmarks::from_slice(&[Point2::default(); 7]).unwrap_err();
        assert!(matches!(err, DmsError::LandmarkCount { expected: 6, actual: 7 }));
    }

    #[test]
    fn test_deserialize_from_pairs() {
        let pairs: Vec<[f32; 2]> = (0..FACE_LANDMARK_COUNT).map(|i| [i as f32, 1.5]).collect();
        let json = serde_json::to_string(&pairs).unwrap();
        let face: FaceLandmarks = serde_json::from_str(&json).unwrap();
        assert_eq!(face.points()[67], Point2::new(67.0, 1.5));

        let short = serde_json::from_str::<FaceLandmarks>("[[1.0, 2.0]]");
        assert!(short.is_err());
    }
}
