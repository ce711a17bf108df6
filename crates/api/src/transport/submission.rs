//! Parsing and validation of client submissions.
//!
//! A submission is rejected here, with a `submit_fail` event, unless every
//! field has the right type, the image decodes, and the generation args
//! validate. Only well-formed jobs reach the pool.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use captioner_core::params::GenerationParams;
use captioner_core::types::{ClientId, RequestId};
use captioner_pool::Job;
use image::{DynamicImage, RgbImage, RgbaImage};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::transport::events::OutboundEvent;

/// Largest accepted image side, in pixels.
pub const MAX_IMAGE_SIDE: u32 = 8192;

/// Inbound frame: `{"event": "<name>", "data": {...}}`.
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Raw `submit` payload. Field types are checked by deserialization.
#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub id: RequestId,
    pub prompt: String,
    /// Base64 of raw RGBA bytes, `image_width * image_height * 4` long.
    pub image: String,
    pub image_width: u32,
    pub image_height: u32,
    #[serde(default)]
    pub args: Map<String, Value>,
}

/// Why a submission was refused. The display text is sent to the client as
/// the `cause`.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Invalid id, prompt, image or args.")]
    InvalidFields,

    #[error("Failed to load image: {0}")]
    Image(String),

    #[error("Invalid args: {0}")]
    Args(String),

    #[error("Server is shutting down")]
    ShuttingDown,
}

/// A refused submission, with the client's id echoed back when it had one.
#[derive(Debug)]
pub struct Rejection {
    pub id: Option<RequestId>,
    pub error: SubmissionError,
}

impl Rejection {
    pub fn to_event(&self) -> OutboundEvent {
        OutboundEvent::SubmitFail {
            id: self.id,
            cause: self.error.to_string(),
        }
    }
}

/// Turn a `submit` payload into a [`Job`] owned by `client`.
pub fn parse_submission(data: Value, client: ClientId) -> Result<Job, Rejection> {
    let id = data.get("id").and_then(Value::as_i64);
    let reject = |error| Rejection { id, error };

    let request: SubmitRequest =
        serde_json::from_value(data).map_err(|_| reject(SubmissionError::InvalidFields))?;
    let image = decode_rgba(&request.image, request.image_width, request.image_height)
        .map_err(reject)?;
    let params = GenerationParams::from_json(Value::Object(request.args))
        .map_err(|e| reject(SubmissionError::Args(e.to_string())))?;

    Ok(Job::new(request.id, client, request.prompt, image, params))
}

/// Decode base64 RGBA pixels and drop the alpha channel.
pub fn decode_rgba(encoded: &str, width: u32, height: u32) -> Result<RgbImage, SubmissionError> {
    if width == 0 || height == 0 {
        return Err(SubmissionError::Image(format!(
            "image dimensions must be non-zero, got {width}x{height}"
        )));
    }
    if width > MAX_IMAGE_SIDE || height > MAX_IMAGE_SIDE {
        return Err(SubmissionError::Image(format!(
            "image dimensions {width}x{height} exceed {MAX_IMAGE_SIDE}x{MAX_IMAGE_SIDE}"
        )));
    }

    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| SubmissionError::Image(e.to_string()))?;

    let expected = width as usize * height as usize * 4;
    if bytes.len() != expected {
        return Err(SubmissionError::Image(format!(
            "expected {expected} bytes of RGBA data for {width}x{height}, got {}",
            bytes.len()
        )));
    }

    let rgba = RgbaImage::from_raw(width, height, bytes).ok_or_else(|| {
        SubmissionError::Image(format!("pixel buffer does not fit {width}x{height}"))
    })?;
    Ok(DynamicImage::ImageRgba8(rgba).to_rgb8())
}
