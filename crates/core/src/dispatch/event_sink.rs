use crossbeam_channel::{Receiver, Sender};

/// Host-side receiver of asynchronous events.
///
/// Called from worker threads; implementations must tolerate concurrent
/// calls.
pub trait EventSink: Send + Sync {
    fn dispatch(&self, event: &str, payload: &str);
}

/// An event as delivered to a [`ChannelEventSink`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchedEvent {
    pub name: String,
    pub payload: String,
}

/// Forwards events into a channel, for hosts that poll and for tests.
pub struct ChannelEventSink {
    tx: Sender<DispatchedEvent>,
}

impl ChannelEventSink {
    pub fn new() -> (Self, Receiver<DispatchedEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelEventSink {
    fn dispatch(&self, event: &str, payload: &str) {
        let sent = self.tx.send(DispatchedEvent {
            name: event.to_string(),
            payload: payload.to_string(),
        });
        if sent.is_err() {
            log::warn!("Event receiver dropped, discarding {event}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards_events() {
        let (sink, rx) = ChannelEventSink::new();
        sink.dispatch("faceDetectionError", "{}");
        let event = rx.try_recv().unwrap();
        assert_eq!(event.name, "faceDetectionError");
        assert_eq!(event.payload, "{}");
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (sink, rx) = ChannelEventSink::new();
        drop(rx);
        sink.dispatch("faceDetectionComplete", "{}");
    }
}
