//! Client protocol: inbound submissions, outbound events, and the observer
//! that connects the worker pool to WebSocket clients.

pub mod events;
pub mod notifier;
pub mod submission;

pub use events::OutboundEvent;
pub use notifier::{spawn_delivery, Notifier, Outbound};
pub use submission::{parse_submission, Envelope, Rejection, SubmissionError};
