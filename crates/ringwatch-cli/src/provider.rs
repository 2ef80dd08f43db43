//! Resolves video identities to decoders, downloading remote videos once.

use parking_lot::Mutex;
use ringwatch_core::Result;
use ringwatch_detect::{DetectResult, VideoProvider};
use ringwatch_media::{DecodeOptions, FrameSource, VideoAsset, VideoDecoder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct RemoteVideoProvider {
    raw_dir: PathBuf,
    decode: DecodeOptions,
    /// Identity to local file, so each URL is fetched at most once per run.
    resolved: Mutex<HashMap<String, PathBuf>>,
}

impl RemoteVideoProvider {
    pub fn new(raw_dir: impl Into<PathBuf>, decode: DecodeOptions) -> Self {
        Self {
            raw_dir: raw_dir.into(),
            decode,
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Local file for `identity`. Existing files are used as-is, anything
    /// else is treated as a URL and downloaded into the raw directory.
    pub fn local_path(&self, identity: &str) -> Result<PathBuf> {
        if let Some(path) = self.resolved.lock().get(identity) {
            return Ok(path.clone());
        }

        let path = if Path::new(identity).is_file() {
            PathBuf::from(identity)
        } else {
            let asset = VideoAsset::retrieve(identity)?;
            info!(
                title = %asset.info().title,
                author = %asset.info().author,
                "Retrieved video info"
            );
            asset.download(asset.default_download_path(&self.raw_dir))?
        };

        self.resolved
            .lock()
            .insert(identity.to_string(), path.clone());
        Ok(path)
    }

    pub fn open_decoder(&self, identity: &str) -> Result<VideoDecoder> {
        let path = self.local_path(identity)?;
        VideoDecoder::open(&path, self.decode)
    }
}

impl VideoProvider for RemoteVideoProvider {
    fn open(&self, identity: &str) -> DetectResult<Box<dyn FrameSource>> {
        Ok(Box::new(self.open_decoder(identity)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_file_is_used_directly() {
        let tmp = tempfile::tempdir().unwrap();
        let video = tmp.path().join("clip.mp4");
        std::fs::write(&video, b"not really a video").unwrap();

        let provider = RemoteVideoProvider::new(tmp.path().join("raw"), DecodeOptions::default());
        let identity = video.to_string_lossy().to_string();
        assert_eq!(provider.local_path(&identity).unwrap(), video);
        assert!(!tmp.path().join("raw").exists());
    }
}
