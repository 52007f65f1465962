//! Configuration schema shared between the Capability Registry and
//! whatever loads it from a file/environment (that loading lives in the
//! gateway binary; this module only defines the recognized shape).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModuleConfig {
    pub enabled: bool,
    pub adapter_type: String,
    #[serde(default)]
    pub config: HashMap<String, toml::Value>,
    /// Name of the environment variable holding the provider's API key,
    /// if any. The key's value itself is never stored here.
    pub api_key_env_var: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModulesConfig {
    pub vad: ModuleConfig,
    pub asr: ModuleConfig,
    pub llm: ModuleConfig,
    pub tts: ModuleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ActivationSettings {
    pub enable_prompt_activation: bool,
    #[serde(default)]
    pub activation_keywords: Vec<String>,
    #[serde(default = "default_activation_timeout")]
    pub activation_timeout_seconds: u64,
    #[serde(default = "default_activation_reply")]
    pub activation_reply: String,
    #[serde(default = "default_deactivation_reply")]
    pub deactivation_reply: String,
}

fn default_activation_timeout() -> u64 {
    60
}
fn default_activation_reply() -> String {
    "I'm listening.".to_string()
}
fn default_deactivation_reply() -> String {
    "Going back to sleep.".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TransportSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

fn default_max_message_size() -> usize {
    10 * 1024 * 1024
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalSettings {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    /// Max retry attempts for `ProviderTransient` failures before
    /// escalating to `ProviderUnavailable`.
    #[serde(default = "default_provider_retries")]
    pub provider_retries: u32,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

fn default_provider_retries() -> u32 {
    2
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub modules: ModulesConfig,
    pub activation_settings: ActivationSettings,
    pub transport: TransportSettings,
    #[serde(default = "GlobalSettings_default")]
    pub global_settings: GlobalSettings,
}

#[allow(non_snake_case)]
fn GlobalSettings_default() -> GlobalSettings {
    GlobalSettings {
        log_level: LogLevel::Info,
        provider_retries: default_provider_retries(),
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            modules: ModulesConfig {
                vad: ModuleConfig {
                    enabled: true,
                    adapter_type: "webrtc".to_string(),
                    config: HashMap::new(),
                    api_key_env_var: None,
                },
                asr: ModuleConfig {
                    enabled: true,
                    adapter_type: "placeholder".to_string(),
                    config: HashMap::new(),
                    api_key_env_var: None,
                },
                llm: ModuleConfig {
                    enabled: true,
                    adapter_type: "placeholder".to_string(),
                    config: HashMap::new(),
                    api_key_env_var: None,
                },
                tts: ModuleConfig {
                    enabled: true,
                    adapter_type: "placeholder".to_string(),
                    config: HashMap::new(),
                    api_key_env_var: None,
                },
            },
            activation_settings: ActivationSettings {
                enable_prompt_activation: false,
                activation_keywords: Vec::new(),
                activation_timeout_seconds: default_activation_timeout(),
                activation_reply: default_activation_reply(),
                deactivation_reply: default_deactivation_reply(),
            },
            transport: TransportSettings {
                host: "0.0.0.0".to_string(),
                port: 8080,
                max_message_size: default_max_message_size(),
            },
            global_settings: GlobalSettings {
                log_level: LogLevel::Info,
                provider_retries: default_provider_retries(),
            },
        }
    }
}
