//! 5-point keypoints as produced by pose-style face models.
//!
//! Order: left eye, right eye, nose, left mouth corner, right mouth corner.

use crate::detection::domain::face_record::{landmark_code, Landmark};

/// Landmark code reported for each keypoint slot.
const KEYPOINT_CODES: [i32; 5] = [
    landmark_code::LEFT_EYE,
    landmark_code::RIGHT_EYE,
    landmark_code::NOSE_BASE,
    landmark_code::LEFT_MOUTH,
    landmark_code::RIGHT_MOUTH,
];

#[derive(Clone, Debug, PartialEq)]
pub struct FaceLandmarks {
    /// Points with x <= 0 are treated as invisible.
    points: [(f64, f64); 5],
}

impl FaceLandmarks {
    pub fn new(points: [(f64, f64); 5]) -> Self {
        Self { points }
    }

    /// Visible keypoints as typed landmarks, in slot order.
    pub fn to_landmarks(&self) -> Vec<Landmark> {
        self.points
            .iter()
            .zip(KEYPOINT_CODES)
            .filter(|((x, _), _)| *x > 0.0)
            .map(|(&(x, y), code)| Landmark::new(code, x as f32, y as f32))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn frontal_landmarks() -> FaceLandmarks {
        FaceLandmarks::new([
            (440.0, 350.0), // left_eye
            (560.0, 350.0), // right_eye
            (500.0, 420.0), // nose
            (460.0, 470.0), // left_mouth
            (540.0, 470.0), // right_mouth
        ])
    }

    #[test]
    fn test_no_visible_points_yields_no_landmarks() {
        assert!(FaceLandmarks::new([(0.0, 0.0); 5]).to_landmarks().is_empty());
    }

    #[test]
    fn test_to_landmarks_maps_slots_to_codes() {
        let landmarks = frontal_landmarks().to_landmarks();
        let codes: Vec<i32> = landmarks.iter().map(|l| l.kind).collect();
        assert_eq!(
            codes,
            vec![
                landmark_code::LEFT_EYE,
                landmark_code::RIGHT_EYE,
                landmark_code::NOSE_BASE,
                landmark_code::LEFT_MOUTH,
                landmark_code::RIGHT_MOUTH,
            ]
        );
        assert_relative_eq!(landmarks[2].x, 500.0);
        assert_relative_eq!(landmarks[2].y, 420.0);
    }

    #[test]
    fn test_to_landmarks_skips_invisible_points() {
        let mut lm = frontal_landmarks();
        lm.points[2] = (0.0, 0.0); // nose hidden
        let landmarks = lm.to_landmarks();
        assert_eq!(landmarks.len(), 4);
        assert!(landmarks.iter().all(|l| l.kind != landmark_code::NOSE_BASE));
    }
}
