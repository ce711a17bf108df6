//! Inference engine boundary for caption workers.
//!
//! A worker thread asks an [`EngineLoader`] for an engine bound to its
//! device once at startup, then calls [`InferenceEngine::generate`] for
//! every job it receives. The real vision-language model lives outside
//! this workspace; [`dummy::DummyEngine`] stands in for it during
//! development and in tests.

pub mod dummy;
pub mod engine;

pub use engine::{EngineError, EngineLoader, GenerationRequest, InferenceEngine};
