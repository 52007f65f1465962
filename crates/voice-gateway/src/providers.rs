//! Populates the Capability Registry at startup. Unknown adapter names
//! are fatal: they prevent the process from starting (§7 `Fatal`).

use std::sync::Arc;

use async_openai::types::audio::SpeechModel;
use voice_core::asr::{AsrProvider, OpenAiAsr, PlaceholderAsr};
use voice_core::capability_registry::{CapabilityRegistry, ProviderConfig};
use voice_core::llm::{LlmProvider, OpenAiLlm, PlaceholderLlm};
use voice_core::tts::{OpenAiTts, PlaceholderTts, TtsProvider};
use voice_core::vad::{PlaceholderVad, VadProvider, VadConfig, WebrtcVadProvider};

pub fn build_registry() -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();

    registry.register_vad(
        "webrtc",
        Box::new(|_cfg: &ProviderConfig| {
            let vad = WebrtcVadProvider::new(&VadConfig::default())
                .map_err(|e| voice_core::VoiceError::Fatal(e.to_string()))?;
            Ok(Box::new(vad) as Box<dyn VadProvider>)
        }),
    );
    registry.register_vad(
        "placeholder",
        Box::new(|_cfg| Ok(Box::new(PlaceholderVad::default()) as Box<dyn VadProvider>)),
    );

    registry.register_asr(
        "placeholder",
        Box::new(|_cfg| Ok(Arc::new(PlaceholderAsr::default()) as Arc<dyn AsrProvider>)),
    );
    registry.register_asr(
        "openai",
        Box::new(|cfg: &ProviderConfig| {
            let api_key = cfg.api_key.clone().ok_or_else(|| {
                voice_core::VoiceError::Fatal("openai asr requires an api key".into())
            })?;
            let model = cfg.model.clone().unwrap_or_else(|| "whisper-1".to_string());
            Ok(Arc::new(OpenAiAsr::new(cfg.api_base.clone(), api_key, model)) as Arc<dyn AsrProvider>)
        }),
    );

    registry.register_llm(
        "placeholder",
        Box::new(|_cfg| Ok(Arc::new(PlaceholderLlm::default()) as Arc<dyn LlmProvider>)),
    );
    registry.register_llm(
        "openai",
        Box::new(|cfg: &ProviderConfig| {
            let api_key = cfg.api_key.clone().ok_or_else(|| {
                voice_core::VoiceError::Fatal("openai llm requires an api key".into())
            })?;
            let model = cfg.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            Ok(Arc::new(OpenAiLlm::new(cfg.api_base.clone(), api_key, model)) as Arc<dyn LlmProvider>)
        }),
    );

    registry.register_tts(
        "placeholder",
        Box::new(|_cfg| Ok(Arc::new(PlaceholderTts) as Arc<dyn TtsProvider>)),
    );
    registry.register_tts(
        "openai",
        Box::new(|cfg: &ProviderConfig| {
            let api_key = cfg.api_key.clone().ok_or_else(|| {
                voice_core::VoiceError::Fatal("openai tts requires an api key".into())
            })?;
            Ok(Arc::new(OpenAiTts::new(
                cfg.api_base.clone(),
                api_key,
                SpeechModel::Gpt4oMiniTts,
            )) as Arc<dyn TtsProvider>)
        }),
    );

    registry
}
