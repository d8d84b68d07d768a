pub mod event_dispatcher;
pub mod event_sink;
pub mod result_message;
