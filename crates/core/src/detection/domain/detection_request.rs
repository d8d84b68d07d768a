use crate::bridge::arguments::ArgumentError;

/// Speed/accuracy trade-off requested by the host.
///
/// Wire codes match the host library constants (`FAST_MODE = 0`,
/// `ACCURATE_MODE = 1`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccuracyMode {
    Fast,
    Accurate,
}

impl AccuracyMode {
    pub fn from_code(code: i32) -> Result<Self, ArgumentError> {
        match code {
            0 => Ok(AccuracyMode::Fast),
            1 => Ok(AccuracyMode::Accurate),
            other => Err(ArgumentError::OutOfRange {
                name: "accuracyMode",
                value: other,
            }),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            AccuracyMode::Fast => 0,
            AccuracyMode::Accurate => 1,
        }
    }
}

/// Parameters of one `detect` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionRequest {
    pub callback_id: i32,
    pub mode: AccuracyMode,
    pub detect_open_eyes: bool,
    pub detect_smile: bool,
    pub prominent_face_only: bool,
}

impl DetectionRequest {
    /// Whether the request needs the classification pass.
    pub fn wants_classification(&self) -> bool {
        self.detect_open_eyes || self.detect_smile
    }
}
