//! TTS capability provider: `synthesize(text, voice, rate, volume) ->
//! stream of audio-bytes`.

use async_openai::config::OpenAIConfig;
use async_openai::types::audio::{
    CreateSpeechRequestArgs, CreateSpeechResponseStreamEvent, SpeechModel, StreamFormat, Voice,
};
use async_openai::Client;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::{VoiceError, VoiceResult};
use crate::events::AudioCodec;

/// One chunk of synthesized audio; codec and sample rate travel with
/// every chunk so the Reply Pipeline never has to track provider state.
#[derive(Debug, Clone)]
pub struct AudioChunkOut {
    pub bytes: Vec<u8>,
    pub codec: AudioCodec,
    pub sample_rate: u32,
}

#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> VoiceResult<BoxStream<'static, VoiceResult<AudioChunkOut>>>;
}

/// Deterministic, offline provider for tests: yields one small
/// non-empty PCM16 chunk synthesized from the text length so tests can
/// assert the stream is non-empty without depending on real audio.
pub struct PlaceholderTts;

#[async_trait]
impl TtsProvider for PlaceholderTts {
    async fn synthesize(
        &self,
        text: &str,
        _voice: Option<&str>,
    ) -> VoiceResult<BoxStream<'static, VoiceResult<AudioChunkOut>>> {
        let sample_count = (text.len() + 1) * 16;
        let bytes: Vec<u8> = (0..sample_count).map(|i| (i % 256) as u8).collect();
        let stream = futures::stream::once(async move {
            Ok(AudioChunkOut {
                bytes,
                codec: AudioCodec::Pcm16,
                sample_rate: 16_000,
            })
        });
        Ok(Box::pin(stream))
    }
}

/// OpenAI-compatible streaming speech provider.
pub struct OpenAiTts {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    default_voice: Voice,
}

impl OpenAiTts {
    pub fn new(api_base: Option<String>, api_key: String, model: SpeechModel) -> Self {
        let mut cfg = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            cfg = cfg.with_api_base(base);
        }
        Self {
            client: Client::with_config(cfg),
            model,
            default_voice: Voice::Alloy,
        }
    }
}

#[async_trait]
impl TtsProvider for OpenAiTts {
    async fn synthesize(
        &self,
        text: &str,
        voice: Option<&str>,
    ) -> VoiceResult<BoxStream<'static, VoiceResult<AudioChunkOut>>> {
        let voice = voice
            .and_then(|v| serde_json::from_value::<Voice>(serde_json::Value::String(v.to_string())).ok())
            .unwrap_or(self.default_voice);

        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .voice(voice)
            .model(self.model.clone())
            .stream_format(StreamFormat::SSE)
            .build()
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?;

        let mut upstream = self
            .client
            .audio()
            .speech()
            .create_stream(request)
            .await
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?;

        let stream = async_stream::stream! {
            while let Some(event) = upstream.next().await {
                match event {
                    Ok(CreateSpeechResponseStreamEvent::SpeechAudioDelta(delta)) => {
                        match STANDARD.decode(&delta.audio) {
                            Ok(bytes) => yield Ok(AudioChunkOut {
                                bytes,
                                codec: AudioCodec::Mp3,
                                sample_rate: 24_000,
                            }),
                            Err(e) => {
                                yield Err(VoiceError::ProviderUnavailable(e.to_string()));
                                break;
                            }
                        }
                    }
                    Ok(CreateSpeechResponseStreamEvent::SpeechAudioDone(_)) => break,
                    Err(e) => {
                        yield Err(VoiceError::ProviderTransient(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_yields_nonempty_audio() {
        let tts = PlaceholderTts;
        let mut stream = tts.synthesize("hello", None).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert!(!chunk.bytes.is_empty());
        assert!(stream.next().await.is_none());
    }
}
