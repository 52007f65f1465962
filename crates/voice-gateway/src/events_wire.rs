//! Inbound JSON wire shapes from §6.1. Binary frames (raw PCM) are
//! handled directly by the websocket loop and never go through serde.

use serde::Deserialize;
use serde_json::Value;
use voice_core::VoiceError;

#[derive(Debug, Deserialize)]
pub struct RawClientEvent {
    pub event_type: String,
    #[serde(default)]
    pub event_data: Value,
    #[serde(default)]
    pub tag_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug)]
pub enum ClientEvent {
    SessionStart { client_type: Option<String> },
    TextInput { text: String, language: Option<String> },
    SpeechEnd,
    ConfigGet,
    ConfigSet(Value),
    ModuleStatusGet,
}

#[derive(Debug, Deserialize, Default)]
struct TextInputData {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    is_final: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct SessionStartData {
    #[serde(default)]
    client_type: Option<String>,
}

pub fn parse(raw: &RawClientEvent) -> Result<ClientEvent, VoiceError> {
    match raw.event_type.as_str() {
        "SYSTEM_CLIENT_SESSION_START" => {
            let data: SessionStartData = serde_json::from_value(raw.event_data.clone()).unwrap_or_default();
            Ok(ClientEvent::SessionStart {
                client_type: data.client_type,
            })
        }
        "CLIENT_TEXT_INPUT" => {
            let data: TextInputData = serde_json::from_value(raw.event_data.clone())
                .map_err(|e| VoiceError::ProtocolViolation(format!("malformed CLIENT_TEXT_INPUT: {e}")))?;
            Ok(ClientEvent::TextInput {
                text: data.text,
                language: data.language,
            })
        }
        "CLIENT_SPEECH_END" => Ok(ClientEvent::SpeechEnd),
        "CONFIG_GET" => Ok(ClientEvent::ConfigGet),
        "CONFIG_SET" => Ok(ClientEvent::ConfigSet(raw.event_data.clone())),
        "MODULE_STATUS_GET" => Ok(ClientEvent::ModuleStatusGet),
        other => Err(VoiceError::ProtocolViolation(format!("unknown event_type: {other}"))),
    }
}
