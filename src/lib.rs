//! # Narrator
//!
//! `narrator` plays a sequence of narrated scenes as an audio-paced slideshow.
//!
//! Each scene carries script text, an optional image and an optional voice-over.
//! The voice-over drives pacing: the image is revealed once narration passes
//! 40% of its duration, and the engine moves to the next scene when narration
//! finishes.
//!
//! ## Core Pieces
//!
//! *   **Playback Engine**: [`PlaybackEngine`], an explicit state machine bound to one
//!     audio output.
//! *   **Output Seam**: the [`AudioOutput`] trait plus a [`SignalQueue`] carrying its
//!     lifecycle signals.
//! *   **Reporting**: an injectable [`Reporter`] instead of ad hoc logging.
//! *   **Image Resolution**: usable-reference checks with a fixed fallback asset.
//! *   **Clocked Output**: a simulated output for headless playback and tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use narrator::{ClockedOutput, DefaultAssetLoader, PlaybackEngine, SignalQueue, TracingReporter};
//! use narrator_schema::SceneSequence;
//! use std::sync::Arc;
//!
//! let scenes = SceneSequence::from_path("scenes.json").unwrap();
//! let queue = SignalQueue::new();
//! let (output, clock) = ClockedOutput::new(Arc::new(DefaultAssetLoader), queue.sender());
//! let mut engine = PlaybackEngine::new(scenes, output, Box::new(TracingReporter));
//!
//! while !engine.snapshot().finished {
//!     clock.advance(0.1);
//!     engine.pump(queue.receiver());
//! }
//! ```

/// The scene playback state machine.
pub mod engine;

/// The audio output abstraction and its signal plumbing.
pub mod output;

/// Structured reporting of playback conditions.
pub mod reporter;

/// Scene image reference resolution.
pub mod scene_image;

/// Simulated, clock-driven audio output.
pub mod clocked;

/// Audio duration probing.
pub mod probe;

pub mod errors;

pub use clocked::{ClockedOutput, PlaybackClock};
pub use engine::{PlaybackEngine, PlaybackSnapshot, ScenePhase};
pub use errors::PlaybackError;
pub use output::{
    AudioOutput, OutputEvent, PlayRejected, Progress, Signal, SignalQueue, SignalSender,
    Subscription,
};
pub use reporter::{MemoryReporter, Report, Reporter, TracingReporter};
pub use scene_image::{resolve_image_src, ImageSlot, FALLBACK_IMAGE};

pub use narrator_schema::{Scene, SceneSequence};

use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::instrument;
use url::Url;

/// Environment variable naming an extra directory searched for assets.
pub const ASSET_ROOT_ENV: &str = "NARRATOR_ASSET_ROOT";

/// A trait for abstracting asset access.
///
/// Audio and image references are resolved through this trait, so the engine
/// can be embedded where direct file system access is restricted or
/// virtualized (an archive, a cache, a test fixture).
pub trait AssetLoader: Send + Sync {
    /// Loads the raw bytes of an asset.
    ///
    /// # Arguments
    /// * `reference` - A `file://` URL or a plain path.
    fn load_bytes(&self, reference: &str) -> Result<Vec<u8>>;
}

/// The default implementation of `AssetLoader` using `std::fs`.
pub struct DefaultAssetLoader;

impl AssetLoader for DefaultAssetLoader {
    /// Reads from the local filesystem, then from `$NARRATOR_ASSET_ROOT` for relative references.
    #[instrument(level = "debug", skip(self), fields(reference = reference))]
    fn load_bytes(&self, reference: &str) -> Result<Vec<u8>> {
        let path = match Url::parse(reference) {
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map_err(|()| anyhow::anyhow!("Not a local file URL: {}", reference))?,
            _ => PathBuf::from(reference),
        };
        let err = match std::fs::read(&path) {
            Ok(bytes) => return Ok(bytes),
            Err(e) => e,
        };

        // Relative references also resolve against the asset root.
        match std::env::var(ASSET_ROOT_ENV) {
            Ok(root) if path.is_relative() => {
                let alt = Path::new(&root).join(&path);
                std::fs::read(&alt).map_err(|e| {
                    anyhow::anyhow!(
                        "Asset not found: {} (checked '{}' and '{}'): {}",
                        reference,
                        path.display(),
                        alt.display(),
                        e
                    )
                })
            }
            _ => Err(anyhow::anyhow!("Asset not found: {}: {}", reference, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_loader_decodes_file_urls() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("narration #3 at 100%");
        std::fs::create_dir(&dir).unwrap();
        let path = dir.join("scene one.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        let url = Url::from_file_path(&path).unwrap();
        assert!(!url.as_str().contains(' '));
        assert_eq!(DefaultAssetLoader.load_bytes(url.as_str()).unwrap(), b"RIFF");

        // Plain paths are read as they are.
        let plain = path.to_str().unwrap();
        assert_eq!(DefaultAssetLoader.load_bytes(plain).unwrap(), b"RIFF");
    }

    #[test]
    fn test_default_loader_reports_missing_file() {
        let root = tempfile::tempdir().unwrap();
        let url = Url::from_file_path(root.path().join("gone.mp3")).unwrap();

        let err = DefaultAssetLoader.load_bytes(url.as_str()).unwrap_err();
        assert!(err.to_string().contains("Asset not found"), "{err}");
    }
}
