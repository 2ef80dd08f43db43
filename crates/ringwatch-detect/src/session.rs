//! ONNX Runtime session wrapper.
//!
//! `ort` sessions need `&mut` to run, so the session sits behind a mutex to
//! let embedders keep the `&self` contract. Gated behind the `onnx` feature.

use crate::error::{DetectError, DetectResult};
use crate::model_manager::ModelId;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use parking_lot::{Mutex, MutexGuard};
use std::path::Path;
use tracing::info;

pub(crate) fn onnx_error(e: impl std::fmt::Display) -> DetectError {
    DetectError::Embedding(format!("ONNX Runtime: {e}"))
}

/// A loaded ONNX model session.
pub struct OnnxSession {
    session: Mutex<Session>,
    model_id: ModelId,
}

impl OnnxSession {
    /// Load an ONNX model from a file path.
    pub fn load(model_path: &Path, model_id: ModelId) -> DetectResult<Self> {
        info!(model = ?model_id, path = %model_path.display(), "Loading ONNX session");

        let threads = num_cpus::get_physical().max(1);
        let session = Session::builder()
            .map_err(onnx_error)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(onnx_error)?
            .with_intra_threads(threads)
            .map_err(onnx_error)?
            .commit_from_file(model_path)
            .map_err(onnx_error)?;

        info!(model = ?model_id, threads, "ONNX session loaded successfully");
        Ok(Self {
            session: Mutex::new(session),
            model_id,
        })
    }

    /// Lock the inner session for a run.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock()
    }

    /// Get the model ID this session was loaded for.
    pub fn model_id(&self) -> ModelId {
        self.model_id
    }
}
