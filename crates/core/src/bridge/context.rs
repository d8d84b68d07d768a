use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bridge::detector_invoker::DetectorInvoker;
use crate::bridge::request_executor::{self, RequestExecutor};
use crate::detection::domain::detection_request::DetectionRequest;
use crate::detection::domain::detector_options::DetectorOptions;
use crate::detection::domain::face_detector::DetectorFactory;
use crate::detection::infrastructure::model_cache::ModelCache;
use crate::detection::infrastructure::onnx_detector_factory::OnnxDetectorFactory;
use crate::dispatch::event_dispatcher::EventDispatcher;
use crate::dispatch::event_sink::EventSink;
use crate::dispatch::result_message::ResultMessage;
use crate::encoding::result_encoder::ResultEncoder;
use crate::shared::bridge_log::BridgeLog;
use crate::shared::config::BridgeConfig;
use crate::shared::pixel_buffer::PixelBuffer;

/// Process-wide bridge state: the log flag, the host's event sink and the
/// detector backend. Created once per host context and disposed with it.
pub struct BridgeContext {
    log: BridgeLog,
    dispatcher: Arc<EventDispatcher>,
    factory: Arc<dyn DetectorFactory>,
    invoker: Arc<DetectorInvoker>,
    executor: Box<dyn RequestExecutor>,
    disposed: AtomicBool,
}

impl BridgeContext {
    /// Context backed by the ONNX detector; model resolution starts now.
    pub fn new(config: &BridgeConfig) -> Self {
        let factory = OnnxDetectorFactory::new(ModelCache::new(config));
        Self::with_factory(config, Arc::new(factory))
    }

    pub fn with_factory(config: &BridgeConfig, factory: Arc<dyn DetectorFactory>) -> Self {
        let log = BridgeLog::new(config.log_enabled);
        let encoder = ResultEncoder::new(config.payload_shape, log.clone());
        let dispatcher = Arc::new(EventDispatcher::new(encoder, log.clone()));
        let invoker = Arc::new(DetectorInvoker::new(
            factory.clone(),
            dispatcher.clone(),
            log.clone(),
        ));
        log.info("Face detection context created");
        Self {
            log,
            dispatcher,
            factory,
            invoker,
            executor: request_executor::for_policy(config.execution),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn log(&self) -> &BridgeLog {
        &self.log
    }

    pub fn set_event_sink(&self, sink: Arc<dyn EventSink>) {
        self.dispatcher.attach(sink);
    }

    pub fn clear_event_sink(&self) {
        self.dispatcher.detach();
    }

    /// Detach the host. In-flight requests still finish; their events are
    /// dropped.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.log.info("Disposing face detection context");
            self.dispatcher.detach();
        }
    }

    pub fn set_log_enabled(&self, value: bool) {
        self.log.set_enabled(value);
        self.log.info(&format!("Logging enabled: {value}"));
    }

    pub fn is_available(&self) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| self.factory.is_available())).unwrap_or_else(|_| {
            log::warn!("isAvailable panicked");
            false
        })
    }

    /// Builds a throwaway detector and reports whether it could run.
    pub fn is_operational(&self) -> bool {
        panic::catch_unwind(AssertUnwindSafe(|| {
            let mut detector = self.factory.build(&DetectorOptions::default());
            let operational = detector.is_operational();
            detector.release();
            operational
        }))
        .unwrap_or_else(|_| {
            log::warn!("isOperational panicked");
            false
        })
    }

    /// Schedule a request and return immediately. Exactly one event for
    /// `request.callback_id` follows, unless the context is disposed first.
    pub fn detect(&self, request: DetectionRequest, image: PixelBuffer) {
        let callback_id = request.callback_id;
        self.log.info(&format!("Scheduling detection for callback {callback_id}"));
        let invoker = self.invoker.clone();
        if let Err(e) = self
            .executor
            .execute(Box::new(move || invoker.invoke(request, image)))
        {
            log::warn!("Rejected detection for callback {callback_id}: {e}");
            self.fail(callback_id, e.to_string());
        }
    }

    /// Emit an error event for `callback_id` without running detection.
    pub fn fail(&self, callback_id: i32, message: impl Into<String>) {
        self.dispatcher
            .send(&ResultMessage::failure(callback_id, message));
    }
}

impl Drop for BridgeContext {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::detector_invoker::testing::{bgra_image, StubBehavior, StubFactory};
    use crate::detection::domain::detection_request::AccuracyMode;
    use crate::dispatch::event_sink::ChannelEventSink;
    use crate::shared::config::ExecutionPolicy;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn request(callback_id: i32) -> DetectionRequest {
        DetectionRequest {
            callback_id,
            mode: AccuracyMode::Accurate,
            detect_open_eyes: false,
            detect_smile: false,
            prominent_face_only: false,
        }
    }

    fn context(behavior: StubBehavior) -> (BridgeContext, Arc<StubFactory>) {
        let factory = Arc::new(StubFactory::new(behavior));
        let ctx = BridgeContext::with_factory(&BridgeConfig::default(), factory.clone());
        (ctx, factory)
    }

    #[test]
    fn test_detect_emits_completion() {
        let (ctx, _) = context(StubBehavior::Faces(1));
        let (sink, rx) = ChannelEventSink::new();
        ctx.set_event_sink(Arc::new(sink));
        ctx.detect(request(21), bgra_image());
        let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(event.name, "faceDetectionComplete");
        let payload: serde_json::Value = serde_json::from_str(&event.payload).unwrap();
        assert_eq!(payload["callbackId"], 21);
    }

    #[test]
    fn test_is_operational_releases_its_detector() {
        let (ctx, factory) = context(StubBehavior::NotOperational);
        assert!(!ctx.is_operational());
        assert_eq!(factory.stats.released.load(Ordering::SeqCst), 1);

        let (ctx, _) = context(StubBehavior::Faces(0));
        assert!(ctx.is_operational());
    }

    #[test]
    fn test_is_available_follows_factory() {
        let factory = Arc::new(StubFactory {
            available: false,
            ..StubFactory::new(StubBehavior::Faces(0))
        });
        let ctx = BridgeContext::with_factory(&BridgeConfig::default(), factory);
        assert!(!ctx.is_available());
    }

    #[test]
    fn test_set_log_enabled_toggles_flag() {
        let (ctx, _) = context(StubBehavior::Faces(0));
        assert!(!ctx.log().is_enabled());
        ctx.set_log_enabled(true);
        assert!(ctx.log().is_enabled());
    }

    #[test]
    fn test_disposed_context_drops_events() {
        let (ctx, _) = context(StubBehavior::Faces(1));
        let (sink, rx) = ChannelEventSink::new();
        ctx.set_event_sink(Arc::new(sink));
        ctx.dispose();
        ctx.detect(request(1), bgra_image());
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn test_rejected_request_still_gets_one_event() {
        let factory = Arc::new(StubFactory::new(StubBehavior::Faces(0)));
        let config = BridgeConfig {
            execution: ExecutionPolicy::Pooled {
                workers: 1,
                queue_capacity: 0,
            },
            ..BridgeConfig::default()
        };
        let ctx = BridgeContext::with_factory(&config, factory);
        let (sink, rx) = ChannelEventSink::new();
        ctx.set_event_sink(Arc::new(sink));

        for id in 0..20 {
            ctx.detect(request(id), bgra_image());
        }
        let mut ids: Vec<i64> = (0..20)
            .map(|_| {
                let event = rx.recv_timeout(Duration::from_secs(5)).unwrap();
                let payload: serde_json::Value = serde_json::from_str(&event.payload).unwrap();
                payload["callbackId"].as_i64().unwrap()
            })
            .collect();
        ids.sort();
        assert_eq!(ids, (0..20).collect::<Vec<_>>());
        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
