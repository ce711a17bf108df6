//! Worker thread body.
//!
//! Loads an engine for the thread's device, then loops: announce
//! `Pending`, block for a task, run it, stream progress, send the result.
//! Any engine failure ends the thread; the handle notices the closed
//! channel and treats it as a worker crash.

use std::sync::Arc;
use std::thread;

use captioner_core::devices::DeviceId;
use captioner_engine::{EngineLoader, GenerationRequest};

use crate::error::PoolError;
use crate::handle::WorkerInfo;
use crate::protocol::{WorkerEndpoint, WorkerLink, WorkerMessage};

/// Start a named worker thread for `info` and return the pool's end of its
/// channels.
pub(crate) fn spawn_worker(
    info: &WorkerInfo,
    loader: Arc<dyn EngineLoader>,
) -> Result<WorkerLink, PoolError> {
    let (mut link, endpoint) = WorkerLink::pair();
    let name = info.name.clone();
    let device = info.device.clone();

    let handle = thread::Builder::new()
        .name(name.clone())
        .spawn(move || run_worker(&name, &device, loader.as_ref(), endpoint))
        .map_err(|source| PoolError::Spawn {
            worker: info.name.clone(),
            source,
        })?;

    tracing::info!(worker = %info.name, device = %info.device, "Worker thread starting");
    link.thread = Some(handle);
    Ok(link)
}

fn run_worker(name: &str, device: &DeviceId, loader: &dyn EngineLoader, mut endpoint: WorkerEndpoint) {
    let span = tracing::info_span!("worker", worker = %name, device = %device);
    let _enter = span.enter();

    tracing::info!("Loading engine");
    let mut engine = match loader.load(device) {
        Ok(engine) => engine,
        Err(e) => {
            tracing::error!(error = %e, "Engine failed to load, worker exiting");
            return;
        }
    };
    tracing::info!("Engine loaded, waiting for tasks");

    let mut generation: u64 = 0;
    loop {
        if !endpoint.send(WorkerMessage::Pending) {
            tracing::debug!("Pool dropped, worker exiting");
            return;
        }

        let Some(task) = endpoint.tasks.blocking_recv() else {
            tracing::info!("Task channel closed, worker exiting");
            return;
        };

        tracing::info!(
            generation,
            prompt = %task.prompt,
            width = task.image.width(),
            height = task.image.height(),
            params = ?task.params,
            "Starting generation",
        );

        let messages = &endpoint.messages;
        let result = engine.generate(
            GenerationRequest {
                prompt: &task.prompt,
                image: task.image.as_ref(),
                params: &task.params,
            },
            &mut |stage: String| {
                tracing::debug!(generation, progress = %stage, "Generation progress");
                let _ = messages.send(WorkerMessage::Progress(stage));
            },
        );

        match result {
            Ok(captions) => {
                tracing::info!(generation, ?captions, "Generation completed");
                generation += 1;
                if !endpoint.send(WorkerMessage::Result(captions)) {
                    tracing::debug!("Pool dropped, worker exiting");
                    return;
                }
            }
            Err(e) => {
                tracing::error!(generation, error = %e, "Generation failed, worker exiting");
                return;
            }
        }
    }
}
