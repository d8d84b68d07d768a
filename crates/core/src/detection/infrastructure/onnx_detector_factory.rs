use std::sync::Arc;

use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::{DetectorFactory, FaceDetector};
use crate::detection::infrastructure::model_cache::{ModelCache, ModelState};
use crate::detection::infrastructure::onnx_face_detector::OnnxFaceDetector;

/// Builds ONNX detectors from the background-resolved model.
///
/// While the model is still being fetched, built detectors are
/// non-operational; once resolution has failed the capability is reported
/// unavailable.
pub struct OnnxDetectorFactory {
    models: Arc<ModelCache>,
}

impl OnnxDetectorFactory {
    pub fn new(models: Arc<ModelCache>) -> Self {
        Self { models }
    }
}

impl DetectorFactory for OnnxDetectorFactory {
    fn is_available(&self) -> bool {
        !matches!(self.models.state(), ModelState::Failed(_))
    }

    fn build(&self, options: &DetectorOptions) -> Box<dyn FaceDetector> {
        let Some(path) = self.models.try_get() else {
            return Box::new(OnnxFaceDetector::unavailable(options.clone()));
        };
        match OnnxFaceDetector::load(&path, options.clone()) {
            Ok(detector) => Box::new(detector),
            Err(e) => {
                log::warn!("Failed to load face model {}: {e}", path.display());
                Box::new(OnnxFaceDetector::unavailable(options.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_failed_resolution_is_unavailable() {
        let factory = OnnxDetectorFactory::new(ModelCache::resolved(Err("offline".into())));
        assert!(!factory.is_available());
        assert!(!factory.build(&DetectorOptions::default()).is_operational());
    }

    #[test]
    fn test_corrupt_model_builds_non_operational_detector() {
        let tmp = TempDir::new().unwrap();
        let path: PathBuf = tmp.path().join("corrupt.onnx");
        std::fs::write(&path, b"not an onnx model").unwrap();

        let factory = OnnxDetectorFactory::new(ModelCache::resolved(Ok(path)));
        assert!(factory.is_available());
        assert!(!factory.build(&DetectorOptions::default()).is_operational());
    }
}
