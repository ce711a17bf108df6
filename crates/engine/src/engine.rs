use captioner_core::devices::DeviceId;
use captioner_core::params::GenerationParams;
use image::RgbImage;

/// Everything the engine needs to caption one image.
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub image: &'a RgbImage,
    pub params: &'a GenerationParams,
}

/// A loaded model bound to one device.
///
/// Engines are created on the worker thread that uses them and never leave
/// it; implementations need not be `Send`.
pub trait InferenceEngine {
    /// Caption one image.
    ///
    /// Blocks for as long as generation takes. Intermediate stage names are
    /// pushed through `progress` in order; the returned list holds the final
    /// captions (`params.num_captions` of them).
    fn generate(
        &mut self,
        request: GenerationRequest<'_>,
        progress: &mut dyn FnMut(String),
    ) -> Result<Vec<String>, EngineError>;
}

/// Builds engines for worker threads.
///
/// Shared by every worker in the pool and called again when a crashed
/// worker is respawned.
pub trait EngineLoader: Send + Sync {
    fn load(&self, device: &DeviceId) -> Result<Box<dyn InferenceEngine>, EngineError>;
}

/// Errors raised by an engine or its loader.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The model could not be loaded onto the device.
    #[error("Failed to load model on {device}: {reason}")]
    Load { device: DeviceId, reason: String },

    /// Generation failed part-way through a job.
    #[error("Generation failed: {0}")]
    Generation(String),
}
