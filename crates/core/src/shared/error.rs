use thiserror::Error;

use crate::bridge::arguments::ArgumentError;

/// Failures that terminate or degrade one detection request.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferConversion { expected: usize, actual: usize },
    #[error("Detector is not operational. Dependencies may have not been downloaded yet. Please, try again later.")]
    DetectorNotOperational,
    #[error("failed to encode result: {0}")]
    Serialization(String),
    #[error("face detection failed: {0}")]
    Detection(String),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        BridgeError::Serialization(e.to_string())
    }
}
