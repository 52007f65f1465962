//! The state machine driving one logical conversation turn: segment ->
//! transcript -> prompt -> reply tokens -> synthesized audio. Owns
//! cancellation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::activation::{ActivationGate, GateOutcome};
use crate::asr::AsrProvider;
use crate::error::VoiceResult;
use crate::events::{HistoryEntry, OutboundEvent, Role, SpeechSegment, Utterance};
use crate::llm::LlmProvider;
use crate::reply_pipeline::run_reply_pipeline;
use crate::resilience::{with_retry, with_timeout, ProviderTimeouts, RetryPolicy};
use crate::tts::TtsProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Listening,
    Transcribing,
    Generating,
    Speaking,
    Completed,
    Cancelled,
}

pub struct OrchestratorConfig {
    pub system_prompt: String,
    pub sample_rate: u32,
    pub carryover_window_ms: u64,
    pub default_voice: Option<String>,
    pub timeouts: ProviderTimeouts,
    pub retry_policy: RetryPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful voice assistant.".to_string(),
            sample_rate: 16_000,
            carryover_window_ms: 8000,
            default_voice: None,
            timeouts: ProviderTimeouts::default(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

struct ActiveTurn {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

struct Shared {
    history: Vec<HistoryEntry>,
    active: Option<ActiveTurn>,
    state: TurnState,
    /// Set when a turn is cancelled by barge-in: the user text it was
    /// processing, and the wall-clock instant its segment closed.
    pending_carryover: Option<(String, Instant)>,
}

/// Drives turns for one session. Shared providers are process-scoped and
/// passed in by reference (Arc); everything else here is session-private.
pub struct TurnOrchestrator {
    config: OrchestratorConfig,
    asr: Arc<dyn AsrProvider>,
    llm: Arc<dyn LlmProvider>,
    tts: Arc<dyn TtsProvider>,
    outbound: mpsc::Sender<OutboundEvent>,
    shared: Arc<Mutex<Shared>>,
    activation: Arc<Mutex<ActivationGate>>,
}

impl TurnOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        asr: Arc<dyn AsrProvider>,
        llm: Arc<dyn LlmProvider>,
        tts: Arc<dyn TtsProvider>,
        activation: ActivationGate,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> Self {
        Self {
            config,
            asr,
            llm,
            tts,
            outbound,
            shared: Arc::new(Mutex::new(Shared {
                history: Vec::new(),
                active: None,
                state: TurnState::Listening,
                pending_carryover: None,
            })),
            activation: Arc::new(Mutex::new(activation)),
        }
    }

    pub async fn state(&self) -> TurnState {
        self.shared.lock().await.state
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.shared.lock().await.history.clone()
    }

    /// Begins a turn from a closed SpeechSegment: cancels any active
    /// turn, transcribes, then proceeds exactly as `submit_text` would.
    pub async fn submit_segment(&self, segment: SpeechSegment) -> VoiceResult<()> {
        self.cancel_active().await;
        {
            let mut shared = self.shared.lock().await;
            shared.state = TurnState::Transcribing;
        }

        let sample_rate = self.config.sample_rate;
        let transcript = with_retry(&self.config.retry_policy, || {
            with_timeout(
                self.config.timeouts.asr,
                self.asr.recognize(&segment.samples, sample_rate, None),
            )
        })
        .await;

        let transcript = match transcript {
            Ok(transcript) => transcript,
            Err(err) => {
                self.send(OutboundEvent::Error {
                    text: err.to_string(),
                    kind: err.kind_tag().to_string(),
                })
                .await;
                let mut shared = self.shared.lock().await;
                shared.state = TurnState::Listening;
                return Ok(());
            }
        };

        if transcript.text.is_empty() {
            self.send(OutboundEvent::AsrUpdate {
                text: String::new(),
                is_final: true,
            })
            .await;
            let mut shared = self.shared.lock().await;
            shared.state = TurnState::Listening;
            return Ok(());
        }

        self.send(OutboundEvent::AsrUpdate {
            text: transcript.text.clone(),
            is_final: true,
        })
        .await;

        self.begin_turn(transcript.text).await
    }

    /// Begins a turn from direct text input. Equivalent to
    /// `submit_segment` but skips ASR.
    pub async fn submit_text(&self, text: String) -> VoiceResult<()> {
        self.cancel_active().await;
        self.begin_turn(text).await
    }

    /// Idempotent: cancels the active turn's CancellationToken and waits
    /// for its teardown to complete before returning.
    pub async fn cancel_active(&self) {
        let active = {
            let mut shared = self.shared.lock().await;
            shared.active.take()
        };
        if let Some(active) = active {
            active.cancel.cancel();
            let _ = active.join.await;
        }
    }

    async fn begin_turn(&self, user_text: String) -> VoiceResult<()> {
        let carryover = {
            let mut shared = self.shared.lock().await;
            match shared.pending_carryover.take() {
                Some((prev_text, closed_at))
                    if closed_at.elapsed() < Duration::from_millis(self.config.carryover_window_ms) =>
                {
                    Some(prev_text)
                }
                _ => None,
            }
        };

        let outcome = self.activation.lock().await.process(&user_text);
        let (utterance_text, scripted_reply) = match outcome {
            GateOutcome::Forward(text) => (Some(text), None),
            GateOutcome::Activated { reply, remainder } => (remainder, Some(reply)),
            GateOutcome::Deactivated { reply } => (None, Some(reply)),
            GateOutcome::Ignored { reply } => (None, Some(reply)),
        };

        if let Some(reply) = scripted_reply {
            self.send(OutboundEvent::SystemMessage { text: reply }).await;
        }

        let Some(utterance_text) = utterance_text else {
            let mut shared = self.shared.lock().await;
            shared.state = TurnState::Listening;
            return Ok(());
        };

        let utterance = Utterance {
            text: utterance_text,
            carryover_prefix: carryover,
        };
        let prompt = utterance.effective_prompt();

        let history_snapshot = self.history().await;
        self.append_history(Role::User, prompt.clone()).await;

        let cancel = CancellationToken::new();
        let llm = self.llm.clone();
        let tts = self.tts.clone();
        let system_prompt = self.config.system_prompt.clone();
        let voice = self.config.default_voice.clone();
        let outbound = self.outbound.clone();
        let shared = self.shared.clone();
        let turn_cancel = cancel.clone();
        let timeouts = self.config.timeouts;
        let retry_policy = self.config.retry_policy;

        {
            let mut shared_guard = self.shared.lock().await;
            shared_guard.state = TurnState::Generating;
        }

        let join = tokio::spawn(async move {
            let result = run_reply_pipeline(
                llm,
                tts,
                &system_prompt,
                &history_snapshot,
                &prompt,
                voice.as_deref(),
                turn_cancel.clone(),
                outbound.clone(),
                &timeouts,
                &retry_policy,
            )
            .await;

            let mut shared = shared.lock().await;
            shared.active = None;
            shared.state = if turn_cancel.is_cancelled() {
                TurnState::Cancelled
            } else {
                TurnState::Completed
            };
            match result {
                Ok(assistant_text) => {
                    shared.history.push(HistoryEntry {
                        role: Role::Assistant,
                        text: assistant_text.clone(),
                        timestamp: chrono::Utc::now(),
                    });
                    if turn_cancel.is_cancelled() {
                        shared.pending_carryover = Some((prompt.clone(), Instant::now()));
                    }
                }
                Err(err) => {
                    if !turn_cancel.is_cancelled() {
                        let _ = outbound
                            .send(OutboundEvent::Error {
                                text: err.to_string(),
                                kind: err.kind_tag().to_string(),
                            })
                            .await;
                    }
                    shared.history.push(HistoryEntry {
                        role: Role::Assistant,
                        text: String::new(),
                        timestamp: chrono::Utc::now(),
                    });
                }
            }
        });

        let mut shared_guard = self.shared.lock().await;
        shared_guard.active = Some(ActiveTurn { cancel, join });
        Ok(())
    }

    async fn append_history(&self, role: Role, text: String) {
        let mut shared = self.shared.lock().await;
        shared.history.push(HistoryEntry {
            role,
            text,
            timestamp: chrono::Utc::now(),
        });
    }

    async fn send(&self, event: OutboundEvent) {
        let _ = self.outbound.send(event).await;
    }
}
