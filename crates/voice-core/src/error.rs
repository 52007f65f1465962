use thiserror::Error;

pub type VoiceResult<T> = Result<T, VoiceError>;

/// Errors raised anywhere in the dialog pipeline.
///
/// Per-session variants (everything except `Fatal` and `UnknownProvider`)
/// are surfaced to the client as an `ERROR` event and never tear down the
/// process.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("invalid audio frame: {0}")]
    InvalidFrame(String),

    #[error("capability provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("capability provider timed out: {0}")]
    ProviderTimeout(String),

    #[error("transient provider error: {0}")]
    ProviderTransient(String),

    #[error("outbound queue overflow")]
    QueueOverflow,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("fatal error: {0}")]
    Fatal(String),

    #[error("unknown capability provider: category={category} name={name}")]
    UnknownProvider { category: String, name: String },

    #[error("vad error: {0}")]
    Vad(String),

    #[error("channel send failed")]
    ChannelSend,

    #[error("channel receive failed")]
    ChannelReceive,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl VoiceError {
    /// Whether this error kind should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, VoiceError::ProviderTransient(_))
    }

    /// The `kind` tag sent with an outbound `ERROR` event.
    pub fn kind_tag(&self) -> &'static str {
        match self {
            VoiceError::InvalidFrame(_) => "InvalidFrame",
            VoiceError::ProviderUnavailable(_) => "ProviderUnavailable",
            VoiceError::ProviderTimeout(_) => "ProviderTimeout",
            VoiceError::ProviderTransient(_) => "ProviderTransient",
            VoiceError::QueueOverflow => "QueueOverflow",
            VoiceError::ProtocolViolation(_) => "ProtocolViolation",
            VoiceError::Fatal(_) => "Fatal",
            VoiceError::UnknownProvider { .. } => "UnknownProvider",
            VoiceError::Vad(_) => "Vad",
            VoiceError::ChannelSend | VoiceError::ChannelReceive => "Channel",
            VoiceError::Io(_) => "Io",
        }
    }
}
