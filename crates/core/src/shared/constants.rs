pub const YOLO_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";
pub const YOLO_MODEL_URL: &str =
    "https://github.com/neutrinographics/faceguard/releases/download/v0.1.0/yolo11n-pose_widerface.onnx";

/// Event emitted with the serialized faces of a finished request.
pub const FACE_DETECTION_COMPLETE: &str = "faceDetectionComplete";
/// Event emitted when a request terminates without results.
pub const FACE_DETECTION_ERROR: &str = "faceDetectionError";

/// Log target for bridge diagnostics gated by the `setLogEnabled` flag.
pub const LOG_TARGET: &str = "FaceDetection";

/// Directory name used under the platform cache/config roots.
pub const APP_DIR_NAME: &str = "FaceBridge";

/// Reported for a probability the detector did not compute.
pub const UNCOMPUTED_PROBABILITY: f32 = -1.0;

pub const BITMAP_DECODE_ERROR: &str = "Error creating Bitmap out of BitmapData";
pub const RESPONSE_ENCODE_ERROR: &str = "Error creating JSON response";
