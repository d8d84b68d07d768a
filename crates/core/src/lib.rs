//! Face detection bridge: decodes host calls, runs a face detector off the
//! calling thread and reports results back as JSON events.

pub mod bridge;
pub mod detection;
pub mod dispatch;
pub mod encoding;
pub mod shared;
