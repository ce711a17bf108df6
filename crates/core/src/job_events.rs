//! WebSocket event name constants for the caption job protocol.
//!
//! Every frame, in both directions, is a JSON envelope of the shape
//! `{"event": "<name>", "data": {...}}`.

// -- client -> server --------------------------------------------------------

/// A new captioning job.
pub const EVENT_SUBMIT: &str = "submit";

// -- server -> client --------------------------------------------------------

/// Current length of the pending queue, broadcast to every client.
pub const EVENT_QUEUE_LEN: &str = "queue_len";

/// Zero-based queue position of one of the client's own jobs.
pub const EVENT_QUEUE_POS: &str = "queue_pos";

/// Intermediate progress text from the worker running the job.
pub const EVENT_PROGRESS: &str = "progress";

/// Final captions for a job.
pub const EVENT_RESULT: &str = "result";

/// The worker running the job died before producing a result.
pub const EVENT_JOB_FAILED: &str = "job_failed";

/// A submission was rejected before reaching the queue.
pub const EVENT_SUBMIT_FAIL: &str = "submit_fail";
