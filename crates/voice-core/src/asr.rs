//! ASR capability provider: `recognize(segment, sample_rate, language) ->
//! Transcript`.

use async_openai::config::OpenAIConfig;
use async_openai::types::audio::{AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_openai::Client;
use async_trait::async_trait;

use crate::error::{VoiceError, VoiceResult};
use crate::events::Transcript;

#[async_trait]
pub trait AsrProvider: Send + Sync {
    async fn recognize(
        &self,
        segment: &[i16],
        sample_rate: u32,
        language: Option<&str>,
    ) -> VoiceResult<Transcript>;
}

/// Deterministic, offline provider for tests: always returns the
/// configured response (or the empty transcript invariant if none).
pub struct PlaceholderAsr {
    pub response: Option<String>,
}

impl Default for PlaceholderAsr {
    fn default() -> Self {
        Self {
            response: Some("hello".to_string()),
        }
    }
}

#[async_trait]
impl AsrProvider for PlaceholderAsr {
    async fn recognize(
        &self,
        segment: &[i16],
        _sample_rate: u32,
        language: Option<&str>,
    ) -> VoiceResult<Transcript> {
        let text = if segment.is_empty() {
            String::new()
        } else {
            self.response.clone().unwrap_or_default()
        };
        Ok(Transcript {
            is_final: true,
            language: language.map(str::to_string),
            text,
        })
    }
}

/// OpenAI-compatible transcription provider.
pub struct OpenAiAsr {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAsr {
    pub fn new(api_base: Option<String>, api_key: String, model: String) -> Self {
        let mut cfg = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            cfg = cfg.with_api_base(base);
        }
        Self {
            client: Client::with_config(cfg),
            model,
        }
    }
}

#[async_trait]
impl AsrProvider for OpenAiAsr {
    async fn recognize(
        &self,
        segment: &[i16],
        sample_rate: u32,
        _language: Option<&str>,
    ) -> VoiceResult<Transcript> {
        let wav = pcm_i16_to_wav(segment, sample_rate);
        let file = async_openai::types::audio::AudioInput::from_bytes("segment.wav".into(), wav.into());
        let request = CreateTranscriptionRequestArgs::default()
            .file(file)
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?;
        let response = self
            .client
            .audio()
            .transcription()
            .create(request)
            .await
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?;
        Ok(Transcript {
            text: response.text,
            language: None,
            is_final: true,
        })
    }
}

/// Wraps raw little-endian PCM16 mono samples in a minimal RIFF/WAVE
/// header so it can be uploaded as a file to a transcription API.
fn pcm_i16_to_wav(samples: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut out = Vec::with_capacity(44 + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes());
    out.extend_from_slice(&16u16.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for s in samples {
        out.extend_from_slice(&s.to_le_bytes());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_returns_empty_transcript_on_empty_segment() {
        let asr = PlaceholderAsr::default();
        let t = asr.recognize(&[], 16_000, None).await.unwrap();
        assert_eq!(t.text, "");
        assert!(t.is_final);
    }

    #[test]
    fn wav_header_has_expected_size() {
        let wav = pcm_i16_to_wav(&[1, 2, 3], 16_000);
        assert_eq!(wav.len(), 44 + 6);
        assert_eq!(&wav[0..4], b"RIFF");
    }
}
