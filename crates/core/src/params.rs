//! Generation options forwarded verbatim to the inference engine.
//!
//! The pool never reads these; they are validated once at the transport
//! boundary and then travel with the job to whichever worker runs it.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::CoreError;

/// Upper bound on beam search width.
pub const MAX_BEAMS: u32 = 64;

/// Sampling and decoding options for one captioning job.
///
/// Missing fields take the engine defaults. Unknown fields are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default, deny_unknown_fields)]
#[validate(schema(function = "validate_length_bounds"))]
pub struct GenerationParams {
    /// Sample with nucleus (top-p) sampling instead of beam search.
    pub use_nucleus_sampling: bool,

    #[validate(range(min = 1, max = MAX_BEAMS))]
    pub num_beams: u32,

    #[validate(range(min = 1, max = 4096))]
    pub max_length: u32,

    #[validate(range(max = 4096))]
    pub min_length: u32,

    /// Cumulative probability cut-off for nucleus sampling.
    #[validate(range(min = 0.0, max = 1.0))]
    pub top_p: f32,

    /// 1.0 means no penalty.
    #[validate(range(exclusive_min = 0.0))]
    pub repetition_penalty: f32,

    pub length_penalty: f32,

    #[validate(range(min = 1, max = 32))]
    pub num_captions: u32,

    #[validate(range(exclusive_min = 0.0))]
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            use_nucleus_sampling: false,
            num_beams: 5,
            max_length: 30,
            min_length: 1,
            top_p: 0.9,
            repetition_penalty: 1.0,
            length_penalty: 1.0,
            num_captions: 1,
            temperature: 1.0,
        }
    }
}

impl GenerationParams {
    /// Parse and validate params from the raw `args` object of a submission.
    pub fn from_json(value: serde_json::Value) -> Result<Self, CoreError> {
        let params: GenerationParams = serde_json::from_value(value)
            .map_err(|e| CoreError::Validation(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }
}

fn validate_length_bounds(params: &GenerationParams) -> Result<(), ValidationError> {
    if params.min_length > params.max_length {
        let mut err = ValidationError::new("length_bounds");
        err.message = Some("min_length must not exceed max_length".into());
        return Err(err);
    }
    Ok(())
}
