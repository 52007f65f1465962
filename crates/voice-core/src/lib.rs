pub mod activation;
pub mod asr;
pub mod capability_registry;
pub mod config;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod llm;
pub mod orchestrator;
pub mod registry;
pub mod reply_pipeline;
pub mod resilience;
pub mod segmenter;
pub mod session;
pub mod tts;
pub mod vad;

pub use error::{VoiceError, VoiceResult};
pub use events::{AudioCodec, AudioFrame, HistoryEntry, OutboundEvent, Role, SessionId, SpeechSegment, Transcript, Utterance};
pub use registry::SessionRegistry;
pub use session::{Session, SessionConfig};
