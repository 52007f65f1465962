//! Streams LLM tokens through a sentence splitter into the TTS, emitting
//! interleaved text and audio events with bounded backpressure.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{VoiceError, VoiceResult};
use crate::events::{HistoryEntry, OutboundEvent};
use crate::llm::LlmProvider;
use crate::resilience::{with_retry, with_timeout, ProviderTimeouts, RetryPolicy};
use crate::tts::TtsProvider;

pub const DEFAULT_OUTBOUND_CAPACITY: usize = 64;
pub const DEFAULT_MAX_PENDING_CHARS: usize = 120;

const SENTENCE_TERMINATORS: &[char] = &['.', '?', '!', '。', '？', '！', '\n'];

/// Accumulates streamed tokens and releases a sentence whenever the
/// buffer contains a terminator or reaches `max_pending_chars`.
pub struct SentenceSplitter {
    buf: String,
    max_pending_chars: usize,
}

impl SentenceSplitter {
    pub fn new(max_pending_chars: usize) -> Self {
        Self {
            buf: String::new(),
            max_pending_chars,
        }
    }

    /// Appends a token, returning any sentence(s) that became ready.
    /// A single push can close more than one sentence if the token
    /// contains multiple terminators.
    pub fn push(&mut self, token: &str) -> Vec<String> {
        let mut ready = Vec::new();
        for ch in token.chars() {
            self.buf.push(ch);
            if SENTENCE_TERMINATORS.contains(&ch) || self.buf.chars().count() >= self.max_pending_chars {
                let sentence = self.buf.trim().to_string();
                self.buf.clear();
                if !sentence.is_empty() {
                    ready.push(sentence);
                }
            }
        }
        ready
    }

    /// Returns any remaining buffered text at stream end.
    pub fn flush(&mut self) -> Option<String> {
        let remainder = self.buf.trim().to_string();
        self.buf.clear();
        if remainder.is_empty() {
            None
        } else {
            Some(remainder)
        }
    }
}

/// Runs one turn's LLM → sentence-split → TTS pipeline, sending every
/// outbound event through `tx`. Returns the full assistant text emitted
/// (used to build the HistoryEntry whether the turn completed or was
/// cancelled).
pub async fn run_reply_pipeline(
    llm: Arc<dyn LlmProvider>,
    tts: Arc<dyn TtsProvider>,
    system_prompt: &str,
    history: &[HistoryEntry],
    user_text: &str,
    voice: Option<&str>,
    cancel: CancellationToken,
    tx: mpsc::Sender<OutboundEvent>,
    timeouts: &ProviderTimeouts,
    retry_policy: &RetryPolicy,
) -> VoiceResult<String> {
    let mut splitter = SentenceSplitter::new(DEFAULT_MAX_PENDING_CHARS);
    let mut full_text = String::new();

    let mut token_stream = with_retry(retry_policy, || {
        llm.generate(system_prompt, history, user_text, cancel.clone())
    })
    .await?;

    let mut first_token = true;
    loop {
        let token_deadline = if first_token {
            timeouts.llm_first_token
        } else {
            timeouts.llm_per_token
        };
        let next = match tokio::time::timeout(token_deadline, token_stream.next()).await {
            Ok(next) => next,
            Err(_) => {
                return Err(VoiceError::ProviderTimeout(format!(
                    "llm token exceeded {token_deadline:?}"
                )))
            }
        };
        let Some(token) = next else { break };
        if cancel.is_cancelled() {
            break;
        }
        let token = token?;
        first_token = false;
        full_text.push_str(&token);
        for sentence in splitter.push(&token) {
            if cancel.is_cancelled() {
                break;
            }
            emit_sentence(&tts, &sentence, voice, &cancel, &tx, timeouts, retry_policy).await?;
        }
    }

    if !cancel.is_cancelled() {
        if let Some(sentence) = splitter.flush() {
            emit_sentence(&tts, &sentence, voice, &cancel, &tx, timeouts, retry_policy).await?;
        }
    }

    if !cancel.is_cancelled() {
        send(&tx, OutboundEvent::TextChunk {
            text: String::new(),
            is_final: true,
        })
        .await?;
    }

    Ok(full_text)
}

async fn emit_sentence(
    tts: &Arc<dyn TtsProvider>,
    sentence: &str,
    voice: Option<&str>,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<OutboundEvent>,
    timeouts: &ProviderTimeouts,
    retry_policy: &RetryPolicy,
) -> VoiceResult<()> {
    send(tx, OutboundEvent::TextChunk {
        text: sentence.to_string(),
        is_final: false,
    })
    .await?;

    with_timeout(timeouts.tts, async {
        let mut audio_stream = with_retry(retry_policy, || tts.synthesize(sentence, voice)).await?;
        while let Some(chunk) = audio_stream.next().await {
            if cancel.is_cancelled() {
                break;
            }
            let chunk = chunk?;
            send(tx, OutboundEvent::AudioChunk {
                data: chunk.bytes,
                codec: chunk.codec,
                sample_rate: chunk.sample_rate,
            })
            .await?;
        }
        Ok(())
    })
    .await
}

async fn send(tx: &mpsc::Sender<OutboundEvent>, event: OutboundEvent) -> VoiceResult<()> {
    tx.send(event)
        .await
        .map_err(|_| crate::error::VoiceError::ChannelSend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_terminator() {
        let mut splitter = SentenceSplitter::new(120);
        assert!(splitter.push("Hello").is_empty());
        let ready = splitter.push(" world.");
        assert_eq!(ready, vec!["Hello world."]);
    }

    #[test]
    fn splits_on_cjk_terminator() {
        let mut splitter = SentenceSplitter::new(120);
        let ready = splitter.push("你好。");
        assert_eq!(ready, vec!["你好。"]);
    }

    #[test]
    fn splits_on_max_pending_chars() {
        let mut splitter = SentenceSplitter::new(5);
        let ready = splitter.push("abcdef");
        assert_eq!(ready, vec!["abcde"]);
    }

    #[test]
    fn flush_returns_remainder() {
        let mut splitter = SentenceSplitter::new(120);
        splitter.push("no terminator yet");
        assert_eq!(splitter.flush().as_deref(), Some("no terminator yet"));
        assert_eq!(splitter.flush(), None);
    }
}
