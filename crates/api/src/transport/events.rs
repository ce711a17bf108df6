//! Server → client events and their JSON envelope.

use axum::extract::ws::Message;
use captioner_core::job_events::{
    EVENT_JOB_FAILED, EVENT_PROGRESS, EVENT_QUEUE_LEN, EVENT_QUEUE_POS, EVENT_RESULT,
    EVENT_SUBMIT_FAIL,
};
use captioner_core::types::RequestId;
use serde_json::{json, Value};

/// One outgoing event. Serialized as `{"event": <name>, "data": {...}}`.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    QueueLen { len: usize },
    QueuePos { id: RequestId, pos: usize },
    Progress { id: RequestId, progress: String },
    Result { id: RequestId, result: Vec<String> },
    JobFailed { id: RequestId, cause: String },
    SubmitFail { id: Option<RequestId>, cause: String },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::QueueLen { .. } => EVENT_QUEUE_LEN,
            OutboundEvent::QueuePos { .. } => EVENT_QUEUE_POS,
            OutboundEvent::Progress { .. } => EVENT_PROGRESS,
            OutboundEvent::Result { .. } => EVENT_RESULT,
            OutboundEvent::JobFailed { .. } => EVENT_JOB_FAILED,
            OutboundEvent::SubmitFail { .. } => EVENT_SUBMIT_FAIL,
        }
    }

    pub fn data(&self) -> Value {
        match self {
            OutboundEvent::QueueLen { len } => json!({ "len": len }),
            OutboundEvent::QueuePos { id, pos } => json!({ "id": id, "pos": pos }),
            OutboundEvent::Progress { id, progress } => json!({ "id": id, "progress": progress }),
            OutboundEvent::Result { id, result } => json!({ "id": id, "result": result }),
            OutboundEvent::JobFailed { id, cause } => json!({ "id": id, "cause": cause }),
            // `id` is omitted when the submission did not carry a usable one.
            OutboundEvent::SubmitFail { id: Some(id), cause } => json!({ "id": id, "cause": cause }),
            OutboundEvent::SubmitFail { id: None, cause } => json!({ "cause": cause }),
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ "event": self.name(), "data": self.data() })
    }

    pub fn to_message(&self) -> Message {
        Message::Text(self.to_json().to_string().into())
    }
}
