//! Embedding model cache manager.
//!
//! Model files are placed by hand under the cache directory; this module
//! resolves where they are expected and reports which ones are present.

use crate::error::{DetectError, DetectResult};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Specification for an embedding model.
pub struct ModelSpec {
    /// Unique identifier.
    pub id: ModelId,
    /// Filename in cache directory.
    pub filename: &'static str,
    /// Where the exported ONNX file can be obtained.
    pub source: &'static str,
    /// Length of the image embedding the model produces.
    pub embedding_dim: usize,
    /// Square input resolution.
    pub input_size: u32,
}

/// Identifies a specific embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// CLIP ViT-B/32 visual encoder.
    ClipVitB32,
    /// CLIP ViT-B/16 visual encoder.
    ClipVitB16,
}

impl ModelId {
    /// Get the specification for this model.
    pub fn spec(&self) -> ModelSpec {
        match self {
            Self::ClipVitB32 => ModelSpec {
                id: *self,
                filename: "clip_vit_b32_visual.onnx",
                source: "https://huggingface.co/openai/clip-vit-base-patch32",
                embedding_dim: 512,
                input_size: 224,
            },
            Self::ClipVitB16 => ModelSpec {
                id: *self,
                filename: "clip_vit_b16_visual.onnx",
                source: "https://huggingface.co/openai/clip-vit-base-patch16",
                embedding_dim: 512,
                input_size: 224,
            },
        }
    }

    /// Human-readable model size.
    pub fn size_human(&self) -> &'static str {
        match self {
            Self::ClipVitB32 => "350 MB",
            Self::ClipVitB16 => "345 MB",
        }
    }
}

/// Resolves model files inside a cache directory.
pub struct ModelManager {
    cache_dir: PathBuf,
}

impl ModelManager {
    /// Create a new model manager with the given cache directory.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// `<user cache dir>/ringwatch/models`, or `./models` when the platform
    /// has no cache directory.
    pub fn default_cache_dir() -> PathBuf {
        dirs::cache_dir()
            .map(|dir| dir.join("ringwatch").join("models"))
            .unwrap_or_else(|| PathBuf::from("models"))
    }

    /// Returns path to cached model. Returns error if it has not been placed yet.
    pub fn ensure_model(&self, model: ModelId) -> DetectResult<PathBuf> {
        let spec = model.spec();
        let local_path = self.cache_dir.join(spec.filename);

        if local_path.exists() {
            debug!(model = ?model, path = %local_path.display(), "Model already cached");
            return Ok(local_path);
        }

        std::fs::create_dir_all(&self.cache_dir)?;

        info!(
            model = ?model,
            source = spec.source,
            size = model.size_human(),
            "Model not cached, export it to ONNX and place it in the cache directory"
        );
        Err(DetectError::ModelNotFound {
            model_id: format!("{:?}", model),
            path: local_path.display().to_string(),
        })
    }

    /// Use `explicit` if given and present, otherwise the cached model.
    pub fn resolve(&self, explicit: Option<&Path>, model: ModelId) -> DetectResult<PathBuf> {
        match explicit {
            Some(path) if path.exists() => Ok(path.to_path_buf()),
            Some(path) => Err(DetectError::ModelNotFound {
                model_id: format!("{:?}", model),
                path: path.display().to_string(),
            }),
            None => self.ensure_model(model),
        }
    }

    /// Check if a model is already cached locally.
    pub fn is_cached(&self, model: ModelId) -> bool {
        self.model_path(model).exists()
    }

    /// Get the local path for a model (may not exist yet).
    pub fn model_path(&self, model: ModelId) -> PathBuf {
        self.cache_dir.join(model.spec().filename)
    }

    /// Get the cache directory path.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }
}

impl Default for ModelManager {
    fn default() -> Self {
        Self::new(Self::default_cache_dir())
    }
}
