use secrecy::SecretString;
use std::path::{Path, PathBuf};

// Voice and format are fixed at build time, not per call.
pub const DEFAULT_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1beta1/text:synthesize";
pub const AUDIO_ENCODING: &str = "MP3";
pub const EFFECTS_PROFILE_ID: &str = "small-bluetooth-speaker-class-device";
pub const PITCH: f64 = 0.0;
pub const SPEAKING_RATE: f64 = 0.85;
pub const LANGUAGE_CODE: &str = "en-US";
pub const VOICE_NAME: &str = "en-US-Chirp3-HD-Achernar";

/// Mime type and file suffix of the decoded asset (matches `AUDIO_ENCODING`).
pub const AUDIO_MIME: &str = "audio/mp3";
pub const AUDIO_SUFFIX: &str = ".mp3";

pub const API_KEY_ENV: &str = "NARRATOR_TTS_KEY";
pub const ENDPOINT_ENV: &str = "NARRATOR_TTS_ENDPOINT";

/// Runtime settings for a synthesis client: where to send requests, the API
/// key, and where temporary assets are created.
pub struct TtsConfig {
    endpoint: String,
    api_key: SecretString,
    asset_dir: Option<PathBuf>,
}

pub struct TtsConfigBuilder {
    config: TtsConfig,
}

impl TtsConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: TtsConfig {
                endpoint: DEFAULT_ENDPOINT.to_string(),
                api_key: SecretString::from(String::new()),
                asset_dir: None,
            },
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.config.endpoint = endpoint.to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    /// Creates temporary assets inside `dir` instead of the system temp dir,
    /// so that persisting them there is a rename.
    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.asset_dir = Some(dir.into());
        self
    }

    pub fn build(self) -> TtsConfig {
        self.config
    }
}

impl Default for TtsConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TtsConfig {
    pub fn builder() -> TtsConfigBuilder {
        TtsConfigBuilder::new()
    }

    /// Defaults, with the API key and endpoint taken from
    /// `NARRATOR_TTS_KEY` / `NARRATOR_TTS_ENDPOINT` when set.
    pub fn from_env() -> Self {
        let mut builder = TtsConfigBuilder::new();
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            builder = builder.with_api_key(&key);
        }
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            builder = builder.with_endpoint(&endpoint);
        }
        builder.build()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn asset_dir(&self) -> Option<&Path> {
        self.asset_dir.as_deref()
    }
}
