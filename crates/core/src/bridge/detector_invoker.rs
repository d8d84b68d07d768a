use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::detection::domain::detection_request::DetectionRequest;
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::{DetectorFactory, FaceDetector};
use crate::detection::domain::face_record::FaceRecord;
use crate::dispatch::event_dispatcher::EventDispatcher;
use crate::dispatch::result_message::ResultMessage;
use crate::shared::bridge_log::BridgeLog;
use crate::shared::error::BridgeError;
use crate::shared::pixel_buffer::PixelBuffer;

/// Releases the wrapped detector when dropped, on every exit path.
struct ReleaseGuard(Box<dyn FaceDetector>);

impl Deref for ReleaseGuard {
    type Target = dyn FaceDetector;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl DerefMut for ReleaseGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Runs one detection request end to end and dispatches its terminal event.
pub struct DetectorInvoker {
    factory: Arc<dyn DetectorFactory>,
    dispatcher: Arc<EventDispatcher>,
    log: BridgeLog,
}

impl DetectorInvoker {
    pub fn new(
        factory: Arc<dyn DetectorFactory>,
        dispatcher: Arc<EventDispatcher>,
        log: BridgeLog,
    ) -> Self {
        Self {
            factory,
            dispatcher,
            log,
        }
    }

    /// Run the request and deliver exactly one event for it.
    pub fn invoke(&self, request: DetectionRequest, image: PixelBuffer) {
        let message = self.run(&request, image);
        self.dispatcher.send(&message);
    }

    /// Run the request to its terminal message. Panics in the detector are
    /// turned into failures.
    pub fn run(&self, request: &DetectionRequest, image: PixelBuffer) -> ResultMessage {
        let callback_id = request.callback_id;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.detect_faces(request, image)));
        match outcome {
            Ok(Ok(faces)) => ResultMessage::success(callback_id, faces),
            Ok(Err(e)) => {
                self.log.info(&e.to_string());
                ResultMessage::failure(callback_id, e.to_string())
            }
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                log::warn!("Detection for callback {callback_id} panicked: {reason}");
                ResultMessage::failure(callback_id, format!("face detection failed: {reason}"))
            }
        }
    }

    fn detect_faces(
        &self,
        request: &DetectionRequest,
        image: PixelBuffer,
    ) -> Result<Vec<FaceRecord>, BridgeError> {
        self.log.info(&format!(
            "Converting {}x{} bitmap to RGBA",
            image.width(),
            image.height()
        ));
        let rgba = image.to_rgba();

        let options = DetectorOptions::for_request(request);
        let mut detector = ReleaseGuard(self.factory.build(&options));
        if !detector.is_operational() {
            log::warn!("Detector not operational for callback {}", request.callback_id);
            return Err(BridgeError::DetectorNotOperational);
        }

        self.log.info("Detecting faces");
        let faces = detector
            .detect(&rgba)
            .map_err(|e| BridgeError::Detection(e.to_string()))?;
        self.log.info(&format!("Detected {} faces", faces.len()));
        Ok(faces)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::detection::domain::detection_request::AccuracyMode;
    use crate::detection::domain::detector_options::ClassificationType;
    use crate::dispatch::event_sink::ChannelEventSink;
    use crate::encoding::result_encoder::ResultEncoder;
    use crate::shared::config::PayloadShape;
    use crate::shared::pixel_buffer::ChannelOrder;
    use rstest::rstest;
    use std::sync::atomic::Ordering;

    fn request(callback_id: i32, open_eyes: bool, smile: bool) -> DetectionRequest {
        DetectionRequest {
            callback_id,
            mode: AccuracyMode::Fast,
            detect_open_eyes: open_eyes,
            detect_smile: smile,
            prominent_face_only: false,
        }
    }

    fn invoker(factory: &Arc<StubFactory>) -> DetectorInvoker {
        let log = BridgeLog::default();
        let dispatcher = Arc::new(EventDispatcher::new(
            ResultEncoder::new(PayloadShape::Legacy, log.clone()),
            log.clone(),
        ));
        DetectorInvoker::new(factory.clone(), dispatcher, log)
    }

    #[test]
    fn test_success_releases_detector() {
        let factory = Arc::new(StubFactory::new(StubBehavior::Faces(2)));
        let message = invoker(&factory).run(&request(5, false, false), bgra_image());
        match message {
            ResultMessage::Success { faces, callback_id } => {
                assert_eq!(callback_id, 5);
                assert_eq!(faces.len(), 2);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(factory.stats.built.load(Ordering::SeqCst), 1);
        assert_eq!(factory.stats.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detector_receives_rgba() {
        let factory = Arc::new(StubFactory::new(StubBehavior::Faces(0)));
        invoker(&factory).run(&request(1, false, false), bgra_image());
        assert_eq!(*factory.stats.orders.lock().unwrap(), vec![ChannelOrder::Rgba]);
        assert_eq!(factory.stats.first_pixels.lock().unwrap()[0], vec![3, 2, 1, 4]);
    }

    #[test]
    fn test_not_operational_fails_without_detecting() {
        let factory = Arc::new(StubFactory::new(StubBehavior::NotOperational));
        let message = invoker(&factory).run(&request(8, false, false), bgra_image());
        assert_eq!(
            message,
            ResultMessage::failure(
                8,
                "Detector is not operational. Dependencies may have not been downloaded yet. Please, try again later."
            )
        );
        assert!(factory.stats.orders.lock().unwrap().is_empty());
        assert_eq!(factory.stats.released.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case(StubBehavior::Fail, "backend exploded")]
    #[case(StubBehavior::Panic, "stub detector panic")]
    fn test_detector_failure_becomes_error(#[case] behavior: StubBehavior, #[case] fragment: &str) {
        let factory = Arc::new(StubFactory::new(behavior));
        let message = invoker(&factory).run(&request(3, false, false), bgra_image());
        match message {
            ResultMessage::Failure { error, callback_id } => {
                assert_eq!(callback_id, 3);
                assert!(error.contains(fragment), "{error}");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(factory.stats.released.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[case(false, false, ClassificationType::None)]
    #[case(true, false, ClassificationType::All)]
    #[case(false, true, ClassificationType::All)]
    #[case(true, true, ClassificationType::All)]
    fn test_classification_follows_flags(
        #[case] open_eyes: bool,
        #[case] smile: bool,
        #[case] expected: ClassificationType,
    ) {
        let factory = Arc::new(StubFactory::new(StubBehavior::Faces(1)));
        invoker(&factory).run(&request(1, open_eyes, smile), bgra_image());
        assert_eq!(factory.stats.options.lock().unwrap()[0].classification, expected);
    }

    #[test]
    fn test_invoke_dispatches_one_event() {
        let factory = Arc::new(StubFactory::new(StubBehavior::Faces(1)));
        let invoker = invoker(&factory);
        let (sink, rx) = ChannelEventSink::new();
        invoker.dispatcher.attach(Arc::new(sink));
        invoker.invoke(request(12, false, false), bgra_image());
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "faceDetectionComplete");
        assert!(rx.try_recv().is_err());
    }
}
