//! Stand-in engine that sleeps instead of running a model.
//!
//! Mirrors the shape of a real captioning run: a few named progress stages,
//! each taking a random fraction of `max_step_delay`, followed by
//! `num_captions` placeholder captions.

use std::thread;
use std::time::Duration;

use captioner_core::devices::DeviceId;
use rand::Rng;

use crate::engine::{EngineError, EngineLoader, GenerationRequest, InferenceEngine};

/// Placeholder caption returned for every job.
pub const DUMMY_CAPTION: &str = "DUMMY RESULT";

/// Number of progress stages reported per job.
pub const DUMMY_STAGES: usize = 3;

/// Loader producing [`DummyEngine`]s.
#[derive(Debug, Clone)]
pub struct DummyLoader {
    /// Upper bound on the simulated model load time.
    pub max_load_delay: Duration,
    /// Upper bound on the time spent in each progress stage.
    pub max_step_delay: Duration,
}

impl DummyLoader {
    pub fn new(max_step_delay: Duration) -> Self {
        Self {
            max_load_delay: max_step_delay * 3,
            max_step_delay,
        }
    }

    /// A loader whose engines never sleep.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl EngineLoader for DummyLoader {
    fn load(&self, device: &DeviceId) -> Result<Box<dyn InferenceEngine>, EngineError> {
        tracing::debug!(device = %device, "Loading dummy engine");
        thread::sleep(random_delay(self.max_load_delay));
        Ok(Box::new(DummyEngine {
            max_step_delay: self.max_step_delay,
        }))
    }
}

/// Engine that reports [`DUMMY_STAGES`] progress stages and returns
/// [`DUMMY_CAPTION`] once per requested caption.
#[derive(Debug)]
pub struct DummyEngine {
    max_step_delay: Duration,
}

impl InferenceEngine for DummyEngine {
    fn generate(
        &mut self,
        request: GenerationRequest<'_>,
        progress: &mut dyn FnMut(String),
    ) -> Result<Vec<String>, EngineError> {
        for stage in 1..=DUMMY_STAGES {
            progress(format!("progress {stage}"));
            thread::sleep(random_delay(self.max_step_delay));
        }
        let count = request.params.num_captions as usize;
        Ok(vec![DUMMY_CAPTION.to_string(); count])
    }
}

fn random_delay(max: Duration) -> Duration {
    if max.is_zero() {
        return Duration::ZERO;
    }
    max.mul_f64(rand::rng().random::<f64>())
}
