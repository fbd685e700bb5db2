//! # Narration Synthesis
//!
//! Turns script text into a locally playable voice-over asset by calling a
//! remote speech-synthesis service.
//!
//! One call to [`TtsProvider::synthesize`] issues one request. The response's
//! base64 audio body is decoded in bounded chunks into a temporary file,
//! wrapped as a [`SynthesisAsset`]. Failures are never retried here; the
//! caller decides what to do with a [`SynthesisError`].

use async_trait::async_trait;
use thiserror::Error;

pub mod asset;
pub mod config;
pub mod providers;
pub mod transport;

pub use asset::{file_url, SynthesisAsset};
pub use config::TtsConfig;
pub use providers::google::GoogleTtsProvider;
pub use transport::{ReqwestTransport, Transport, TransportResponse};

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("Synthesis request failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("Synthesis service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("No audio content received")]
    MissingPayload,
    #[error("Failed to decode audio payload: {0}")]
    Decode(#[from] base64::DecodeError),
    #[error("Failed to write synthesis asset: {0}")]
    Asset(#[from] std::io::Error),
}

impl From<reqwest::Error> for SynthesisError {
    fn from(err: reqwest::Error) -> Self {
        SynthesisError::Transport(Box::new(err))
    }
}

pub type SynthesisResult<T> = Result<T, SynthesisError>;

#[async_trait]
pub trait TtsProvider: Send + Sync {
    /// Synthesizes `text` and returns a temporary, locally addressable audio asset.
    ///
    /// The asset is deleted when dropped; keep it (or [`SynthesisAsset::persist`] it)
    /// for as long as anything refers to its URL.
    async fn synthesize(&self, text: &str) -> SynthesisResult<SynthesisAsset>;

    /// Returns the provider name (e.g., "google").
    fn name(&self) -> &'static str;
}
