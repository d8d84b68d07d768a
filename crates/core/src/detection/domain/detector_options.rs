use crate::detection::domain::detection_request::{AccuracyMode, DetectionRequest};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassificationType {
    None,
    All,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LandmarkType {
    None,
    All,
}

/// Detector configuration derived from one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectorOptions {
    pub mode: AccuracyMode,
    pub classification: ClassificationType,
    pub landmarks: LandmarkType,
    pub tracking: bool,
    pub prominent_face_only: bool,
}

impl DetectorOptions {
    /// Classification runs only when a probability was asked for. Landmarks
    /// are always on and tracking always off: inputs are single still images.
    pub fn for_request(request: &DetectionRequest) -> Self {
        let classification = if request.wants_classification() {
            ClassificationType::All
        } else {
            ClassificationType::None
        };
        Self {
            mode: request.mode,
            classification,
            landmarks: LandmarkType::All,
            tracking: false,
            prominent_face_only: request.prominent_face_only,
        }
    }
}

impl Default for DetectorOptions {
    fn default() -> Self {
        Self {
            mode: AccuracyMode::Fast,
            classification: ClassificationType::None,
            landmarks: LandmarkType::All,
            tracking: false,
            prominent_face_only: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn request(eyes: bool, smile: bool, prominent: bool) -> DetectionRequest {
        DetectionRequest {
            callback_id: 9,
            mode: AccuracyMode::Accurate,
            detect_open_eyes: eyes,
            detect_smile: smile,
            prominent_face_only: prominent,
        }
    }

    #[rstest]
    #[case::nothing(false, false, ClassificationType::None)]
    #[case::eyes(true, false, ClassificationType::All)]
    #[case::smile(false, true, ClassificationType::All)]
    #[case::both(true, true, ClassificationType::All)]
    fn test_classification_follows_flags(
        #[case] eyes: bool,
        #[case] smile: bool,
        #[case] expected: ClassificationType,
    ) {
        let options = DetectorOptions::for_request(&request(eyes, smile, false));
        assert_eq!(options.classification, expected);
    }

    #[rstest]
    #[case(true)]
    #[case(false)]
    fn test_fixed_settings(#[case] prominent: bool) {
        let options = DetectorOptions::for_request(&request(false, false, prominent));
        assert_eq!(options.landmarks, LandmarkType::All);
        assert!(!options.tracking);
        assert_eq!(options.prominent_face_only, prominent);
        assert_eq!(options.mode, AccuracyMode::Accurate);
    }
}
