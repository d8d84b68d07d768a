use std::collections::BTreeMap;

use serde::Serialize;

use crate::detection::domain::face_record::{landmark_code, FaceRecord};
use crate::dispatch::result_message::ResultMessage;
use crate::shared::bridge_log::BridgeLog;
use crate::shared::config::PayloadShape;
use crate::shared::constants::{FACE_DETECTION_COMPLETE, FACE_DETECTION_ERROR, RESPONSE_ENCODE_ERROR};
use crate::shared::error::BridgeError;

/// Key prefix for a landmark code; `None` for codes with no mapping.
pub fn landmark_key(code: i32) -> Option<&'static str> {
    match code {
        landmark_code::BOTTOM_MOUTH => Some("mouth"),
        landmark_code::LEFT_EYE => Some("leftEye"),
        landmark_code::RIGHT_EYE => Some("rightEye"),
        landmark_code::LEFT_EAR => Some("leftEar"),
        landmark_code::LEFT_EAR_TIP => Some("leftEarTip"),
        landmark_code::LEFT_CHEEK => Some("leftCheek"),
        landmark_code::LEFT_MOUTH => Some("leftMouth"),
        landmark_code::RIGHT_EAR => Some("rightEar"),
        landmark_code::RIGHT_EAR_TIP => Some("rightEarTip"),
        landmark_code::RIGHT_CHEEK => Some("rightCheek"),
        landmark_code::RIGHT_MOUTH => Some("rightMouth"),
        landmark_code::NOSE_BASE => Some("noseBase"),
        _ => None,
    }
}

/// Flat per-face object as the host consumes it.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacePayload {
    pub face_x: f32,
    pub face_y: f32,
    pub face_width: f32,
    pub face_height: f32,
    pub left_eye_open_probability: f32,
    pub right_eye_open_probability: f32,
    pub is_smiling_probability: f32,
    #[serde(flatten)]
    pub landmarks: BTreeMap<String, f32>,
}

impl FacePayload {
    /// Fails when any value is non-finite, which JSON cannot represent.
    pub fn from_face(face: &FaceRecord) -> Result<Self, BridgeError> {
        let mut landmarks = BTreeMap::new();
        for landmark in &face.landmarks {
            if let Some(key) = landmark_key(landmark.kind) {
                landmarks.insert(format!("{key}X"), landmark.x);
                landmarks.insert(format!("{key}Y"), landmark.y);
            }
        }
        let payload = Self {
            face_x: face.x,
            face_y: face.y,
            face_width: face.width,
            face_height: face.height,
            left_eye_open_probability: face.left_eye_open_or_sentinel(),
            right_eye_open_probability: face.right_eye_open_or_sentinel(),
            is_smiling_probability: face.smiling_or_sentinel(),
            landmarks,
        };
        if !payload.is_finite() {
            return Err(BridgeError::Serialization(
                "face contains a non-finite value".into(),
            ));
        }
        Ok(payload)
    }

    fn is_finite(&self) -> bool {
        [
            self.face_x,
            self.face_y,
            self.face_width,
            self.face_height,
            self.left_eye_open_probability,
            self.right_eye_open_probability,
            self.is_smiling_probability,
        ]
        .iter()
        .chain(self.landmarks.values())
        .all(|v| v.is_finite())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyResponse {
    faces: String,
    callback_id: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StructuredResponse<'a> {
    faces: &'a [FacePayload],
    callback_id: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse<'a> {
    callback_id: i32,
    error: &'a str,
}

/// A terminal event ready to hand to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedEvent {
    pub name: &'static str,
    pub payload: String,
    pub callback_id: i32,
}

/// Turns result messages into event name/payload pairs.
#[derive(Clone, Debug)]
pub struct ResultEncoder {
    shape: PayloadShape,
    log: BridgeLog,
}

impl ResultEncoder {
    pub fn new(shape: PayloadShape, log: BridgeLog) -> Self {
        Self { shape, log }
    }

    /// Always yields an event: a success whose response cannot be encoded
    /// becomes an error event for the same callback id.
    pub fn encode(&self, message: &ResultMessage) -> EncodedEvent {
        match message {
            ResultMessage::Success { faces, callback_id } => {
                match self.encode_success(faces, *callback_id) {
                    Ok(payload) => EncodedEvent {
                        name: FACE_DETECTION_COMPLETE,
                        payload,
                        callback_id: *callback_id,
                    },
                    Err(e) => {
                        log::warn!("Failed to encode response for {callback_id}: {e}");
                        self.log.info(RESPONSE_ENCODE_ERROR);
                        error_event(*callback_id, RESPONSE_ENCODE_ERROR)
                    }
                }
            }
            ResultMessage::Failure { error, callback_id } => error_event(*callback_id, error),
        }
    }

    pub fn encode_success(&self, faces: &[FaceRecord], callback_id: i32) -> Result<String, BridgeError> {
        let payloads = self.face_payloads(faces);
        let response = match self.shape {
            PayloadShape::Legacy => {
                let mut encoded = Vec::with_capacity(payloads.len());
                for payload in &payloads {
                    encoded.push(serde_json::to_string(payload)?);
                }
                serde_json::to_string(&LegacyResponse {
                    faces: serde_json::to_string(&encoded)?,
                    callback_id,
                })?
            }
            PayloadShape::Structured => serde_json::to_string(&StructuredResponse {
                faces: &payloads,
                callback_id,
            })?,
        };
        Ok(response)
    }

    /// Encodable faces in input order; the rest are logged and dropped.
    fn face_payloads(&self, faces: &[FaceRecord]) -> Vec<FacePayload> {
        let payloads: Vec<FacePayload> = faces
            .iter()
            .filter_map(|face| match FacePayload::from_face(face) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    log::warn!("Dropping face from result: {e}");
                    self.log.info("Error making JSON out of Face object");
                    None
                }
            })
            .collect();
        self.log.info(&format!("Parsed {} faces", payloads.len()));
        payloads
    }
}

pub fn error_payload(callback_id: i32, message: &str) -> String {
    serde_json::to_string(&ErrorResponse {
        callback_id,
        error: message,
    })
    .unwrap_or_else(|_| serde_json::json!({ "callbackId": callback_id, "error": message }).to_string())
}

fn error_event(callback_id: i32, message: &str) -> EncodedEvent {
    EncodedEvent {
        name: FACE_DETECTION_ERROR,
        payload: error_payload(callback_id, message),
        callback_id,
    }
}
