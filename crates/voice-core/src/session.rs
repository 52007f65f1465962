//! Per-client container holding the audio pipeline, conversation
//! history, activation state, and the outbound event channel.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::activation::ActivationGate;
use crate::asr::AsrProvider;
use crate::error::{VoiceError, VoiceResult};
use crate::events::{OutboundEvent, SessionId};
use crate::ingestion::{AudioIngestion, IngestionConfig};
use crate::llm::LlmProvider;
use crate::orchestrator::{OrchestratorConfig, TurnOrchestrator};
use crate::segmenter::{SegmenterConfig, SegmenterEvent, TurnSegmenter};
use crate::tts::TtsProvider;
use crate::vad::VadProvider;

pub struct SessionConfig {
    pub ingestion: IngestionConfig,
    pub segmenter: SegmenterConfig,
    pub orchestrator: OrchestratorConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ingestion: IngestionConfig::default(),
            segmenter: SegmenterConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

/// One connected client. Exclusively owns its pipeline components,
/// history, and outbound queue.
pub struct Session {
    pub id: SessionId,
    ingestion: Mutex<AudioIngestion>,
    vad: Mutex<Box<dyn VadProvider>>,
    segmenter: Mutex<TurnSegmenter>,
    orchestrator: TurnOrchestrator,
    outbound_tx: mpsc::Sender<OutboundEvent>,
    outbound_rx: Mutex<mpsc::Receiver<OutboundEvent>>,
    closed: Mutex<bool>,
    vad_threshold: f32,
}

impl Session {
    pub fn new(
        id: SessionId,
        config: SessionConfig,
        vad: Box<dyn VadProvider>,
        asr: Arc<dyn AsrProvider>,
        llm: Arc<dyn LlmProvider>,
        tts: Arc<dyn TtsProvider>,
        activation: ActivationGate,
        outbound_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(outbound_capacity);
        let vad_threshold = config.segmenter.threshold;
        let orchestrator = TurnOrchestrator::new(config.orchestrator, asr, llm, tts, activation, tx.clone());
        Self {
            id,
            ingestion: Mutex::new(AudioIngestion::new(&config.ingestion)),
            vad: Mutex::new(vad),
            segmenter: Mutex::new(TurnSegmenter::new(config.segmenter)),
            orchestrator,
            outbound_tx: tx,
            outbound_rx: Mutex::new(rx),
            closed: Mutex::new(false),
            vad_threshold,
        }
    }

    /// Surfaces a per-session error to the client as an `ERROR` event.
    /// Never terminates the session; the caller decides whether to
    /// continue or fail the current turn.
    pub async fn emit_error(&self, err: &VoiceError) {
        let _ = self
            .outbound_tx
            .send(OutboundEvent::Error {
                text: err.to_string(),
                kind: err.kind_tag().to_string(),
            })
            .await;
    }

    /// Pushes one raw PCM frame from the transport and drives it through
    /// ingestion -> VAD -> Segmenter, submitting any closed segment to
    /// the Orchestrator. `SpeechStarted` triggers barge-in by cancelling
    /// any active reply turn immediately.
    pub async fn on_audio_frame(&self, bytes: &[u8]) -> VoiceResult<()> {
        let dropped = {
            let mut ingestion = self.ingestion.lock().await;
            match ingestion.push_frame(bytes) {
                Ok(dropped) => dropped,
                Err(err) => {
                    self.emit_error(&err).await;
                    return Ok(());
                }
            }
        };
        if let Some(dropped) = dropped {
            tracing::warn!(
                session_id = %self.id,
                dropped_samples = dropped.dropped_samples,
                "ingestion backpressure dropped samples"
            );
        }

        loop {
            let window = {
                let mut ingestion = self.ingestion.lock().await;
                ingestion.next_window()
            };
            let Some(window) = window else { break };

            let probability = {
                let mut vad = self.vad.lock().await;
                vad.detect(&window.samples)?
            };

            let event = {
                let mut segmenter = self.segmenter.lock().await;
                segmenter.process(window, probability)
            };

            match event {
                Some(SegmenterEvent::SpeechStarted) => {
                    self.orchestrator.cancel_active().await;
                }
                Some(SegmenterEvent::EndOfSpeech { segment, .. }) => {
                    self.orchestrator.submit_segment(segment).await?;
                }
                None => {}
            }
        }
        let _ = self.vad_threshold;
        Ok(())
    }

    /// Forces the current segment closed, for push-to-talk clients
    /// (`CLIENT_SPEECH_END`). Any partial segment is treated as if
    /// silence had just closed it.
    pub async fn on_speech_end(&self) -> VoiceResult<()> {
        let mut segmenter = self.segmenter.lock().await;
        if let Some(SegmenterEvent::EndOfSpeech { segment, .. }) = segmenter.force_close() {
            drop(segmenter);
            self.orchestrator.submit_segment(segment).await?;
        }
        Ok(())
    }

    /// `CLIENT_TEXT_INPUT` equivalent: treated as an independent turn
    /// arriving after any active segment closes.
    pub async fn on_text_input(&self, text: String) -> VoiceResult<()> {
        self.orchestrator.submit_text(text).await
    }

    /// Pulls the next queued outbound event, blocking until one is
    /// available or the session is closed.
    pub async fn drain_outbound(&self) -> Option<OutboundEvent> {
        let mut rx = self.outbound_rx.lock().await;
        rx.recv().await
    }

    pub async fn history(&self) -> Vec<crate::events::HistoryEntry> {
        self.orchestrator.history().await
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.lock().await
    }

    /// Idempotent: cancels any active turn and marks the session closed.
    pub async fn close(&self) {
        let mut closed = self.closed.lock().await;
        if *closed {
            return;
        }
        self.orchestrator.cancel_active().await;
        *closed = true;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("id", &self.id).finish()
    }
}
