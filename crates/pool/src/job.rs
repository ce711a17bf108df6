use std::fmt;
use std::sync::Arc;

use captioner_core::params::GenerationParams;
use captioner_core::types::{ClientId, RequestId, Timestamp};
use image::RgbImage;

/// One captioning request waiting for, or running on, a worker.
///
/// A job lives in exactly one place at a time: the pool's queue or a single
/// worker handle. The worker thread reads the image through a shared `Arc`.
pub struct Job {
    id: RequestId,
    client: ClientId,
    prompt: String,
    image: Arc<RgbImage>,
    params: GenerationParams,
    submitted_at: Timestamp,
}

impl Job {
    pub fn new(
        id: RequestId,
        client: ClientId,
        prompt: impl Into<String>,
        image: RgbImage,
        params: GenerationParams,
    ) -> Self {
        Self {
            id,
            client,
            prompt: prompt.into(),
            image: Arc::new(image),
            params,
            submitted_at: chrono::Utc::now(),
        }
    }

    /// Client-assigned identifier, unique only within [`client`](Self::client).
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Connection that submitted this job.
    pub fn client(&self) -> ClientId {
        self.client
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn image(&self) -> &Arc<RgbImage> {
        &self.image
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    pub fn submitted_at(&self) -> Timestamp {
        self.submitted_at
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("client", &self.client)
            .field("prompt", &self.prompt)
            .field("image", &format_args!("{}x{}", self.image.width(), self.image.height()))
            .field("params", &self.params)
            .field("submitted_at", &self.submitted_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_omits_pixels() {
        let job = Job::new(
            7,
            ClientId::new(),
            "a photo of",
            RgbImage::new(640, 480),
            GenerationParams::default(),
        );
        let rendered = format!("{job:?}");
        assert!(rendered.contains("640x480"));
        assert!(rendered.len() < 1024);
    }

    #[test]
    fn accessors_return_constructor_values() {
        let client = ClientId::new();
        let job = Job::new(3, client, "prompt", RgbImage::new(1, 2), GenerationParams::default());
        assert_eq!(job.id(), 3);
        assert_eq!(job.client(), client);
        assert_eq!(job.prompt(), "prompt");
        assert_eq!(job.image().dimensions(), (1, 2));
    }
}
