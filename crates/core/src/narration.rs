use std::{path::Path, time::Duration};

use async_trait::async_trait;
use tokio::fs;
use tracing::info;

use crate::{
    error::{Result, SpendreelError},
    provider::api_key_from_env,
    render::probe_duration,
    types::NarrationAudio,
};

/// Turns narration text into an audio file and reports its duration.
#[async_trait]
pub trait NarrationSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<NarrationAudio>;
}

const SPEECH_API_URL: &str = "https://api.openai.com/v1/audio/speech";

pub const DEFAULT_VOICE: &str = "alloy";

/// OpenAI-compatible text-to-speech endpoint.
pub struct OpenAiSpeech {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    model: String,
    voice: String,
    probe_timeout: Duration,
}

impl OpenAiSpeech {
    pub const ENV_VAR: &'static str = "OPENAI_API_KEY";

    pub fn new(client: reqwest::Client, api_key: String, probe_timeout: Duration) -> Self {
        Self {
            client,
            api_key,
            api_url: SPEECH_API_URL.to_string(),
            model: "gpt-4o-mini-tts".to_string(),
            voice: DEFAULT_VOICE.to_string(),
            probe_timeout,
        }
    }

    pub fn from_env(client: reqwest::Client, probe_timeout: Duration) -> Result<Self> {
        Ok(Self::new(
            client,
            api_key_from_env(Self::ENV_VAR)?,
            probe_timeout,
        ))
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }
}

#[async_trait]
impl NarrationSynthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str, dest: &Path) -> Result<NarrationAudio> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "voice": self.voice,
                "input": text,
                "response_format": "mp3",
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SpendreelError::NarrationFailed {
                reason: format!("status {}: {}", status, body),
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(SpendreelError::NarrationFailed {
                reason: "speech service returned no audio".to_string(),
            });
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(dest, &audio).await?;

        let duration_seconds = probe_duration(dest, self.probe_timeout).await?;
        info!(path = %dest.display(), duration_seconds, "narration synthesized");

        Ok(NarrationAudio {
            path: dest.to_path_buf(),
            duration_seconds,
        })
    }
}
