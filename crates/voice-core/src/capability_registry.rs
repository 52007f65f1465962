//! `{category, name} -> factory` table used once at startup to
//! instantiate each provider from configuration. Replaces the dynamic
//! import/service-locator pattern with an explicit, compile-time table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::asr::AsrProvider;
use crate::error::{VoiceError, VoiceResult};
use crate::llm::LlmProvider;
use crate::tts::TtsProvider;
use crate::vad::VadProvider;

pub struct ProviderConfig {
    pub adapter_type: String,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub model: Option<String>,
}

type AsrFactory = Box<dyn Fn(&ProviderConfig) -> VoiceResult<Arc<dyn AsrProvider>> + Send + Sync>;
type LlmFactory = Box<dyn Fn(&ProviderConfig) -> VoiceResult<Arc<dyn LlmProvider>> + Send + Sync>;
type TtsFactory = Box<dyn Fn(&ProviderConfig) -> VoiceResult<Arc<dyn TtsProvider>> + Send + Sync>;
type VadFactory =
    Box<dyn Fn(&ProviderConfig) -> VoiceResult<Box<dyn VadProvider>> + Send + Sync>;

/// Process-scope factory table. Constructed once at startup and shared
/// (read-only after registration) across every Session.
#[derive(Default)]
pub struct CapabilityRegistry {
    asr: HashMap<String, AsrFactory>,
    llm: HashMap<String, LlmFactory>,
    tts: HashMap<String, TtsFactory>,
    vad: HashMap<String, VadFactory>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_asr(&mut self, name: impl Into<String>, factory: AsrFactory) {
        self.asr.insert(name.into(), factory);
    }

    pub fn register_llm(&mut self, name: impl Into<String>, factory: LlmFactory) {
        self.llm.insert(name.into(), factory);
    }

    pub fn register_tts(&mut self, name: impl Into<String>, factory: TtsFactory) {
        self.tts.insert(name.into(), factory);
    }

    pub fn register_vad(&mut self, name: impl Into<String>, factory: VadFactory) {
        self.vad.insert(name.into(), factory);
    }

    pub fn create_asr(&self, config: &ProviderConfig) -> VoiceResult<Arc<dyn AsrProvider>> {
        self.asr
            .get(&config.adapter_type)
            .ok_or_else(|| unknown("asr", &config.adapter_type))?(config)
    }

    pub fn create_llm(&self, config: &ProviderConfig) -> VoiceResult<Arc<dyn LlmProvider>> {
        self.llm
            .get(&config.adapter_type)
            .ok_or_else(|| unknown("llm", &config.adapter_type))?(config)
    }

    pub fn create_tts(&self, config: &ProviderConfig) -> VoiceResult<Arc<dyn TtsProvider>> {
        self.tts
            .get(&config.adapter_type)
            .ok_or_else(|| unknown("tts", &config.adapter_type))?(config)
    }

    pub fn create_vad(&self, config: &ProviderConfig) -> VoiceResult<Box<dyn VadProvider>> {
        self.vad
            .get(&config.adapter_type)
            .ok_or_else(|| unknown("vad", &config.adapter_type))?(config)
    }
}

fn unknown(category: &str, name: &str) -> VoiceError {
    VoiceError::UnknownProvider {
        category: category.to_string(),
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asr::PlaceholderAsr;

    #[test]
    fn unknown_adapter_is_fatal_at_lookup() {
        let registry = CapabilityRegistry::new();
        let config = ProviderConfig {
            adapter_type: "does-not-exist".to_string(),
            api_key: None,
            api_base: None,
            model: None,
        };
        let err = registry.create_asr(&config).unwrap_err();
        assert!(matches!(err, VoiceError::UnknownProvider { .. }));
    }

    #[test]
    fn registered_factory_is_used() {
        let mut registry = CapabilityRegistry::new();
        registry.register_asr(
            "placeholder",
            Box::new(|_cfg| Ok(Arc::new(PlaceholderAsr::default()) as Arc<dyn AsrProvider>)),
        );
        let config = ProviderConfig {
            adapter_type: "placeholder".to_string(),
            api_key: None,
            api_base: None,
            model: None,
        };
        assert!(registry.create_asr(&config).is_ok());
    }
}
