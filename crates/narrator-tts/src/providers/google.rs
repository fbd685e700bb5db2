use crate::config::{
    TtsConfig, AUDIO_ENCODING, EFFECTS_PROFILE_ID, LANGUAGE_CODE, PITCH, SPEAKING_RATE, VOICE_NAME,
};
use crate::transport::{ReqwestTransport, Transport, TransportResponse};
use crate::{SynthesisAsset, SynthesisError, SynthesisResult, TtsProvider};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Client for the Google Cloud `text:synthesize` endpoint.
pub struct GoogleTtsProvider {
    config: TtsConfig,
    transport: Arc<dyn Transport>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    #[serde(default)]
    audio_content: Option<String>,
}

impl GoogleTtsProvider {
    pub fn new(config: TtsConfig) -> Self {
        Self::with_transport(config, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(config: TtsConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    async fn request_asset(&self, body: &serde_json::Value) -> SynthesisResult<SynthesisAsset> {
        let response = self
            .transport
            .post_json(self.config.endpoint(), self.config.api_key(), body)
            .await?;
        let payload = extract_audio_content(response)?;
        SynthesisAsset::from_base64(&payload, self.config.asset_dir())
    }
}

/// Builds the request body. Only the text varies between calls.
pub fn build_request_body(text: &str) -> serde_json::Value {
    json!({
        "audioConfig": {
            "audioEncoding": AUDIO_ENCODING,
            "effectsProfileId": [EFFECTS_PROFILE_ID],
            "pitch": PITCH,
            "speakingRate": SPEAKING_RATE,
        },
        "input": {
            "text": text,
        },
        "voice": {
            "languageCode": LANGUAGE_CODE,
            "name": VOICE_NAME,
        },
    })
}

/// Validates a response and returns its base64 audio body.
///
/// A success status whose body lacks a non-empty `audioContent` (including a
/// body that is not the expected JSON object) is a missing payload.
pub fn extract_audio_content(response: TransportResponse) -> SynthesisResult<String> {
    if !response.is_success() {
        return Err(SynthesisError::Status {
            status: response.status,
            body: response.body,
        });
    }

    let parsed: SynthesizeResponse =
        serde_json::from_str(&response.body).map_err(|_| SynthesisError::MissingPayload)?;

    match parsed.audio_content {
        Some(content) if !content.is_empty() => Ok(content),
        _ => Err(SynthesisError::MissingPayload),
    }
}

#[async_trait]
impl TtsProvider for GoogleTtsProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    #[instrument(level = "debug", skip(self, text), fields(text_len = text.len()))]
    async fn synthesize(&self, text: &str) -> SynthesisResult<SynthesisAsset> {
        if text.is_empty() {
            warn!("Synthesizing empty text");
        }

        match self.request_asset(&build_request_body(text)).await {
            Ok(asset) => {
                info!(bytes = asset.len(), path = %asset.path().display(), "Synthesized narration");
                Ok(asset)
            }
            Err(e) => {
                error!("Error generating audio: {}", e);
                Err(e)
            }
        }
    }
}
