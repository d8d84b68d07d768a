use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_record::FaceRecord;
use crate::shared::pixel_buffer::PixelBuffer;

/// Domain interface for a configured, single-use face detector.
///
/// `detect` receives RGBA pixels. `release` frees native resources and
/// must be safe to call more than once.
pub trait FaceDetector: Send {
    /// Whether the detector can service requests right now.
    fn is_operational(&self) -> bool;

    fn detect(
        &mut self,
        image: &PixelBuffer,
    ) -> Result<Vec<FaceRecord>, Box<dyn std::error::Error>>;

    fn release(&mut self);
}

/// Builds fresh detectors and reports whether the capability exists at all.
pub trait DetectorFactory: Send + Sync {
    /// False when the backend can never become operational on this device.
    fn is_available(&self) -> bool;

    fn build(&self, options: &DetectorOptions) -> Box<dyn FaceDetector>;
}
