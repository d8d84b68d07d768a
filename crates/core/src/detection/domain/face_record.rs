use crate::shared::constants::UNCOMPUTED_PROBABILITY;

/// Landmark type codes, numbered as the host detector library numbers them.
pub mod landmark_code {
    pub const BOTTOM_MOUTH: i32 = 0;
    pub const LEFT_CHEEK: i32 = 1;
    pub const LEFT_EAR_TIP: i32 = 2;
    pub const LEFT_EAR: i32 = 3;
    pub const LEFT_EYE: i32 = 4;
    pub const LEFT_MOUTH: i32 = 5;
    pub const NOSE_BASE: i32 = 6;
    pub const RIGHT_CHEEK: i32 = 7;
    pub const RIGHT_EAR_TIP: i32 = 8;
    pub const RIGHT_EAR: i32 = 9;
    pub const RIGHT_EYE: i32 = 10;
    pub const RIGHT_MOUTH: i32 = 11;
}

/// A named point on a face. The type is kept as a raw code so that
/// backends may report types this crate does not know about.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Landmark {
    pub kind: i32,
    pub x: f32,
    pub y: f32,
}

impl Landmark {
    pub fn new(kind: i32, x: f32, y: f32) -> Self {
        Self { kind, x, y }
    }
}

/// One detected face, in input-image pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FaceRecord {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// `None` when classification was not run.
    pub left_eye_open_probability: Option<f32>,
    pub right_eye_open_probability: Option<f32>,
    pub smiling_probability: Option<f32>,
    pub landmarks: Vec<Landmark>,
}

impl FaceRecord {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            left_eye_open_probability: None,
            right_eye_open_probability: None,
            smiling_probability: None,
            landmarks: Vec::new(),
        }
    }

    pub fn left_eye_open_or_sentinel(&self) -> f32 {
        self.left_eye_open_probability.unwrap_or(UNCOMPUTED_PROBABILITY)
    }

    pub fn right_eye_open_or_sentinel(&self) -> f32 {
        self.right_eye_open_probability.unwrap_or(UNCOMPUTED_PROBABILITY)
    }

    pub fn smiling_or_sentinel(&self) -> f32 {
        self.smiling_probability.unwrap_or(UNCOMPUTED_PROBABILITY)
    }
}
