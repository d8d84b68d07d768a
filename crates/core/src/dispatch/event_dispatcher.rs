use std::sync::{Arc, PoisonError, RwLock};

use crate::dispatch::event_sink::EventSink;
use crate::dispatch::result_message::ResultMessage;
use crate::encoding::result_encoder::{EncodedEvent, ResultEncoder};
use crate::shared::bridge_log::BridgeLog;

/// Encodes result messages and hands them to the host's sink.
///
/// The sink is swappable and may be detached on dispose; events emitted
/// with no sink attached are dropped with a warning. The read lock is held
/// for the whole host callback, so `attach` and `detach` wait for in-flight
/// dispatches and a sink never runs after it has been replaced. A sink must
/// not call back into `attach` or `detach` from `dispatch`.
pub struct EventDispatcher {
    sink: RwLock<Option<Arc<dyn EventSink>>>,
    encoder: ResultEncoder,
    log: BridgeLog,
}

impl EventDispatcher {
    pub fn new(encoder: ResultEncoder, log: BridgeLog) -> Self {
        Self {
            sink: RwLock::new(None),
            encoder,
            log,
        }
    }

    pub fn attach(&self, sink: Arc<dyn EventSink>) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    pub fn detach(&self) {
        *self.sink.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn send(&self, message: &ResultMessage) {
        let event = self.encoder.encode(message);
        self.deliver(&event);
    }

    pub fn deliver(&self, event: &EncodedEvent) {
        let slot = self.sink.read().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(sink) => {
                self.log.info(&format!(
                    "Dispatching {} for callback {}",
                    event.name, event.callback_id
                ));
                sink.dispatch(event.name, &event.payload);
            }
            None => log::warn!(
                "No event sink attached, dropping {} for callback {}",
                event.name,
                event.callback_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::event_sink::ChannelEventSink;
    use crate::shared::config::PayloadShape;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;
    use std::time::Duration;

    fn dispatcher() -> EventDispatcher {
        let log = BridgeLog::default();
        EventDispatcher::new(ResultEncoder::new(PayloadShape::Legacy, log.clone()), log)
    }

    #[test]
    fn test_send_reaches_attached_sink() {
        let d = dispatcher();
        let (sink, rx) = ChannelEventSink::new();
        d.attach(Arc::new(sink));
        d.send(&ResultMessage::failure(9, "nope"));
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "faceDetectionError");
        let payload: serde_json::Value = serde_json::from_str(&event.payload).unwrap();
        assert_eq!(payload["callbackId"], 9);
        assert_eq!(payload["error"], "nope");
    }

    #[test]
    fn test_detached_sink_drops_events() {
        let d = dispatcher();
        let (sink, rx) = ChannelEventSink::new();
        d.attach(Arc::new(sink));
        d.detach();
        d.send(&ResultMessage::success(1, vec![]));
        assert!(rx.try_recv().is_err());
    }

    struct SlowSink {
        entered: crossbeam_channel::Sender<()>,
        finished: Arc<AtomicBool>,
    }

    impl EventSink for SlowSink {
        fn dispatch(&self, _event: &str, _payload: &str) {
            let _ = self.entered.send(());
            thread::sleep(Duration::from_millis(200));
            self.finished.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_detach_waits_for_in_flight_dispatch() {
        let d = Arc::new(dispatcher());
        let (entered_tx, entered_rx) = crossbeam_channel::bounded(1);
        let finished = Arc::new(AtomicBool::new(false));
        d.attach(Arc::new(SlowSink {
            entered: entered_tx,
            finished: finished.clone(),
        }));

        let worker = {
            let d = d.clone();
            thread::spawn(move || d.send(&ResultMessage::success(1, vec![])))
        };
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        d.detach();
        assert!(finished.load(Ordering::SeqCst));
        worker.join().unwrap();
    }

    #[test]
    fn test_poisoned_lock_still_delivers() {
        let d = Arc::new(dispatcher());
        let poisoner = d.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.sink.write().unwrap();
            panic!("poison the sink lock");
        })
        .join();

        let (sink, rx) = ChannelEventSink::new();
        d.attach(Arc::new(sink));
        d.send(&ResultMessage::failure(2, "still here"));
        assert_eq!(rx.try_recv().unwrap().name, "faceDetectionError");
    }
}
