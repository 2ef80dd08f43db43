//! Ringwatch Detect - reference-sequence detection
//!
//! Builds a discriminator embedding from labeled occurrences of a short
//! pattern, then scores fixed-size windows of a target video against it:
//! - Embeddings and embedders (grid colour layout, CLIP via ONNX Runtime)
//! - Cosine metrics (vector and pairwise-mean)
//! - Reference sequences and video providers
//! - The detector, its result table, and fade-in/fade-out pairing
//! - Olympic rings presets

pub mod detector;
pub mod embedder;
pub mod embedding;
pub mod error;
pub mod metric;
pub mod model_manager;
pub mod occurrence;
pub mod presets;
pub mod reference;
pub mod report;

#[cfg(feature = "onnx")]
pub mod clip;
#[cfg(feature = "onnx")]
pub mod session;

pub use detector::{
    bootstrap, window_starts, DetectCancel, DetectOptions, Detector, DetectorConfig, ReadMode,
};
pub use embedder::{Embedder, GridEmbedder, MeanPooled};
pub use embedding::{Embedding, EmbeddingLayout};
pub use error::{DetectError, DetectResult};
pub use metric::{CosineSimilarity, Metric, PairwiseMeanCosine, VectorCosine};
pub use model_manager::{ModelId, ModelManager};
pub use occurrence::{pair_occurrences, write_occurrences_csv, Occurrence};
pub use reference::{InMemoryProvider, ReferenceSequence, VideoProvider};
pub use report::{DetectionRow, DetectionSpan, DetectionTable};

#[cfg(feature = "onnx")]
pub use clip::{ClipConfig, ClipEmbedder};
