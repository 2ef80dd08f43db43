//! CLIP visual encoder via ONNX Runtime.
//!
//! Expects a visual-only export that maps `pixel_values` `[N, 3, 224, 224]`
//! to `image_embeds` `[N, D]`. Requires the `onnx` feature.

use crate::embedder::Embedder;
use crate::embedding::Embedding;
use crate::error::{DetectError, DetectResult};
use crate::model_manager::{ModelId, ModelManager};
use crate::session::{onnx_error, OnnxSession};
use image::imageops::FilterType;
use image::{imageops, RgbImage};
use ndarray::Array4;
use ort::value::TensorRef;
use ringwatch_core::{FrameBuffer, PixelFormat};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// CLIP normalisation mean per RGB channel.
pub const CLIP_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];
/// CLIP normalisation standard deviation per RGB channel.
#[allow(clippy::excessive_precision)]
pub const CLIP_STD: [f32; 3] = [0.268_629_54, 0.261_302_58, 0.275_777_11];

/// Settings for [`ClipEmbedder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClipConfig {
    /// Explicit model file. Falls back to the model cache when unset.
    pub model_path: Option<PathBuf>,
    pub input_name: String,
    pub output_name: String,
    pub image_size: u32,
    /// Frames per inference call.
    pub batch_size: usize,
}

impl Default for ClipConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_name: "pixel_values".into(),
            output_name: "image_embeds".into(),
            image_size: 224,
            batch_size: 16,
        }
    }
}

/// Per-frame CLIP image embeddings.
pub struct ClipEmbedder {
    session: OnnxSession,
    config: ClipConfig,
}

impl ClipEmbedder {
    /// Load the model named by `config`, or the cached CLIP ViT-B/32.
    pub fn load(config: ClipConfig, models: &ModelManager) -> DetectResult<Self> {
        if config.batch_size == 0 || config.image_size == 0 {
            return Err(DetectError::Config(
                "CLIP batch size and image size must be positive".into(),
            ));
        }
        let path = models.resolve(config.model_path.as_deref(), ModelId::ClipVitB32)?;
        let session = OnnxSession::load(&path, ModelId::ClipVitB32)?;
        Ok(Self { session, config })
    }

    fn run_batch(&self, frames: &[FrameBuffer]) -> DetectResult<Vec<Vec<f32>>> {
        let input = preprocess_batch(frames, self.config.image_size)?;
        let tensor = TensorRef::from_array_view(input.view()).map_err(onnx_error)?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![self.config.input_name.as_str() => tensor])
            .map_err(onnx_error)?;
        let output = outputs.get(self.config.output_name.as_str()).ok_or_else(|| {
            DetectError::Embedding(format!(
                "model has no output named {:?}",
                self.config.output_name
            ))
        })?;
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(onnx_error)?;
        split_rows(&shape[..], data, frames.len())
    }
}

/// Split a `[N, D]` model output into one row per frame.
fn split_rows(shape: &[i64], data: &[f32], frames: usize) -> DetectResult<Vec<Vec<f32>>> {
    let mismatch = || DetectError::ShapeMismatch {
        expected: format!("[{frames}, D] with D > 0"),
        actual: format!("{shape:?}"),
    };
    let &[n, dim] = shape else {
        return Err(mismatch());
    };
    if n as usize != frames || dim <= 0 || data.len() != frames * dim as usize {
        return Err(mismatch());
    }
    Ok(data.chunks_exact(dim as usize).map(<[f32]>::to_vec).collect())
}

impl Embedder for ClipEmbedder {
    fn embed(&self, frames: &[FrameBuffer]) -> DetectResult<Embedding> {
        if frames.is_empty() {
            return Err(DetectError::Embedding("cannot embed an empty window".into()));
        }
        let mut rows = Vec::with_capacity(frames.len());
        for batch in frames.chunks(self.config.batch_size) {
            rows.extend(self.run_batch(batch)?);
        }
        debug!(frames = frames.len(), "CLIP window embedded");
        Embedding::per_frame(rows)
    }

    fn name(&self) -> &str {
        "clip"
    }
}

/// Convert a frame to an `image` RGB buffer.
fn to_rgb_image(frame: &FrameBuffer) -> DetectResult<RgbImage> {
    let packed = match frame.format {
        PixelFormat::Rgb8 => frame.to_packed(),
        _ => {
            let mut out = Vec::with_capacity(frame.width as usize * frame.height as usize * 3);
            for y in 0..frame.height {
                for x in 0..frame.width {
                    out.extend_from_slice(&frame.pixel_rgb(x, y));
                }
            }
            out
        }
    };
    RgbImage::from_raw(frame.width, frame.height, packed)
        .ok_or_else(|| DetectError::Embedding("frame buffer size mismatch".into()))
}

/// Resize and normalise frames into an NCHW tensor.
pub fn preprocess_batch(frames: &[FrameBuffer], size: u32) -> DetectResult<Array4<f32>> {
    let side = size as usize;
    let mut tensor = Array4::<f32>::zeros((frames.len(), 3, side, side));
    for (n, frame) in frames.iter().enumerate() {
        let image = to_rgb_image(frame)?;
        let resized = if image.dimensions() == (size, size) {
            image
        } else {
            imageops::resize(&image, size, size, FilterType::Triangle)
        };
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let value = pixel[c] as f32 / 255.0;
                tensor[[n, c, y as usize, x as usize]] = (value - CLIP_MEAN[c]) / CLIP_STD[c];
            }
        }
    }
    Ok(tensor)
}
