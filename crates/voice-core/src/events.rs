use serde::{Deserialize, Serialize};

pub type SessionId = String;

/// An event queued for delivery to the client. The transport drains these
/// at its own pace; the Reply Pipeline blocks on enqueue rather than
/// dropping any of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "event_data")]
pub enum OutboundEvent {
    #[serde(rename = "SYSTEM_SERVER_SESSION_START")]
    SessionStart { session_id: SessionId },

    #[serde(rename = "SERVER_TEXT_RESPONSE")]
    TextChunk { text: String, is_final: bool },

    #[serde(rename = "SERVER_AUDIO_RESPONSE")]
    AudioChunk {
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
        codec: AudioCodec,
        sample_rate: u32,
    },

    #[serde(rename = "ASR_UPDATE")]
    AsrUpdate { text: String, is_final: bool },

    #[serde(rename = "SERVER_SYSTEM_MESSAGE")]
    SystemMessage { text: String },

    #[serde(rename = "ERROR")]
    Error { text: String, kind: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Pcm16,
    Wav,
    Mp3,
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(d)?;
        STANDARD
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// One raw PCM frame as it arrives from the transport: 16 kHz, mono,
/// 16-bit signed samples, plus a monotonic sample offset.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<i16>,
    pub offset: u64,
}

/// An ordered run of frames bounded by speech-start and end-of-speech.
#[derive(Debug, Clone, Default)]
pub struct SpeechSegment {
    pub samples: Vec<i16>,
    pub start_offset: u64,
    pub end_offset: u64,
}

impl SpeechSegment {
    pub fn duration_ms(&self, sample_rate: u32) -> u64 {
        (self.samples.len() as u64 * 1000) / sample_rate as u64
    }
}

/// The final recognized text for one SpeechSegment.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub text: String,
    pub language: Option<String>,
    pub is_final: bool,
}

/// User-originated text, whether it came from ASR or direct text input,
/// plus any carried-over prefix from a barge-in interruption.
#[derive(Debug, Clone)]
pub struct Utterance {
    pub text: String,
    pub carryover_prefix: Option<String>,
}

impl Utterance {
    /// The text actually sent to the LLM: carry-over prefix joined with
    /// a single space, applied exactly once.
    pub fn effective_prompt(&self) -> String {
        match &self.carryover_prefix {
            Some(prefix) if !prefix.is_empty() => format!("{prefix} {}", self.text),
            _ => self.text.clone(),
        }
    }
}

/// Conversational role of a recorded history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: Role,
    pub text: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}
