//! End-to-end scenarios driving a Session with Placeholder providers.

use std::sync::Arc;
use std::time::Duration;

use voice_core::activation::{ActivationConfig, ActivationGate};
use voice_core::asr::PlaceholderAsr;
use voice_core::events::{AudioCodec, OutboundEvent};
use voice_core::ingestion::IngestionConfig;
use voice_core::llm::PlaceholderLlm;
use voice_core::orchestrator::OrchestratorConfig;
use voice_core::segmenter::SegmenterConfig;
use voice_core::session::{Session, SessionConfig};
use voice_core::tts::PlaceholderTts;
use voice_core::vad::PlaceholderVad;

fn default_segmenter() -> SegmenterConfig {
    SegmenterConfig {
        sample_rate: 1000,
        threshold: 0.5,
        eos_silence_ms: 300,
        max_segment_ms: 3000,
    }
}

fn new_session_with(
    reply: &str,
    activation: ActivationConfig,
    segmenter: SegmenterConfig,
) -> Session {
    Session::new(
        "test-session".to_string(),
        SessionConfig {
            ingestion: IngestionConfig {
                sample_rate: 1000,
                window_samples: 100,
                backlog_seconds: 5,
            },
            segmenter,
            orchestrator: OrchestratorConfig {
                carryover_window_ms: 60_000,
                ..OrchestratorConfig::default()
            },
        },
        Box::new(PlaceholderVad {
            fixed_decision: None,
            use_energy: true,
            energy_threshold: 200.0,
        }),
        Arc::new(PlaceholderAsr {
            response: Some("hello".to_string()),
        }),
        Arc::new(PlaceholderLlm {
            reply: reply.to_string(),
        }),
        Arc::new(PlaceholderTts),
        ActivationGate::new(activation),
        64,
    )
}

fn new_session(reply: &str, activation: ActivationConfig) -> Session {
    new_session_with(reply, activation, default_segmenter())
}

fn disabled_activation() -> ActivationConfig {
    ActivationConfig {
        enable_prompt_activation: false,
        ..ActivationConfig::default()
    }
}

async fn drain_until_final_text(session: &Session) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), session.drain_outbound())
            .await
            .expect("timed out waiting for outbound event")
            .expect("outbound channel closed unexpectedly");
        let is_final_text = matches!(&event, OutboundEvent::TextChunk { is_final, .. } if *is_final);
        events.push(event);
        if is_final_text {
            break;
        }
    }
    events
}

fn samples_for(n: usize, loud: bool) -> Vec<u8> {
    let sample: i16 = if loud { 20_000 } else { 0 };
    let mut bytes = Vec::with_capacity(n * 2);
    for _ in 0..n {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

#[tokio::test]
async fn plain_text_turn() {
    let session = new_session("Hi!", disabled_activation());
    session.on_text_input("hello".to_string()).await.unwrap();

    let events = drain_until_final_text(&session).await;

    let text_chunks: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            OutboundEvent::TextChunk { text, is_final } => Some((text.clone(), *is_final)),
            _ => None,
        })
        .collect();
    assert_eq!(text_chunks, vec![("Hi!".to_string(), false), (String::new(), true)]);

    let has_audio = events
        .iter()
        .any(|e| matches!(e, OutboundEvent::AudioChunk { data, codec, .. } if !data.is_empty() && *codec == AudioCodec::Pcm16));
    assert!(has_audio, "expected at least one non-empty audio chunk");

    let history = session_history(&session).await;
    let history_refs: Vec<(&str, &str)> = history.iter().map(|(r, t)| (*r, t.as_str())).collect();
    assert_eq!(history_refs, vec![("user", "hello"), ("assistant", "Hi!")]);
}

#[tokio::test]
async fn voice_turn_with_quiet_tail_closes_exactly_one_segment() {
    let session = new_session("Hi!", disabled_activation());

    // 2s of loud speech at 1000 Hz, then >=1.3s of silence: with
    // eos_silence_ms=300 in this config, the segment closes partway
    // through the silence run, and only one EndOfSpeech fires.
    session.on_audio_frame(&samples_for(2000, true)).await.unwrap();
    session.on_audio_frame(&samples_for(1300, false)).await.unwrap();

    let mut asr_updates = 0;
    loop {
        let event = tokio::time::timeout(Duration::from_secs(2), session.drain_outbound())
            .await
            .expect("timed out")
            .expect("channel closed");
        if let OutboundEvent::AsrUpdate { is_final, .. } = event {
            assert!(is_final);
            asr_updates += 1;
            break;
        }
    }
    assert_eq!(asr_updates, 1);
}

#[tokio::test]
async fn barge_in_stops_old_turn_before_new_speech_transcript() {
    let session = Arc::new(new_session("one two three four five", disabled_activation()));

    session.on_text_input("hello".to_string()).await.unwrap();

    // Let at least one sentence/audio chunk go out before interrupting.
    let _ = tokio::time::timeout(Duration::from_secs(2), session.drain_outbound())
        .await
        .unwrap();

    // Speech begins: this is the barge-in signal and cancels the active turn.
    session.on_audio_frame(&samples_for(500, true)).await.unwrap();

    // The session must still be usable afterward (cancellation completed).
    session.on_audio_frame(&samples_for(1300, false)).await.unwrap();

    let history = session_history(&session).await;
    assert_eq!(history.first().map(|(r, t)| (*r, t.as_str())), Some(("user", "hello")));
}

#[tokio::test]
async fn activation_gate_drops_input_until_keyword_heard() {
    let activation = ActivationConfig {
        enable_prompt_activation: true,
        activation_keywords: vec!["hello assistant".to_string()],
        activation_timeout_seconds: 60,
        activation_reply: "activated".to_string(),
        deactivation_reply: "not listening".to_string(),
    };
    let session = new_session("joke response", activation);

    session.on_text_input("tell me a joke".to_string()).await.unwrap();
    let event = tokio::time::timeout(Duration::from_secs(2), session.drain_outbound())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, OutboundEvent::SystemMessage { text } if text == "not listening"));

    session
        .on_text_input("hello assistant, tell me a joke".to_string())
        .await
        .unwrap();
    let event = tokio::time::timeout(Duration::from_secs(2), session.drain_outbound())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(event, OutboundEvent::SystemMessage { text } if text == "activated"));

    let events = drain_until_final_text(&session).await;
    let has_joke_text = events
        .iter()
        .any(|e| matches!(e, OutboundEvent::TextChunk { text, .. } if text.contains("joke")));
    assert!(has_joke_text);
}

#[tokio::test]
async fn max_segment_cutoff_forces_two_segments() {
    let session = new_session_with(
        "Hi!",
        disabled_activation(),
        SegmenterConfig {
            sample_rate: 1000,
            threshold: 0.5,
            eos_silence_ms: 300,
            max_segment_ms: 1000,
        },
    );

    // Continuous loud speech for 6s with max_segment_ms=1000 in this
    // config forces a close partway through, and the remainder keeps
    // accumulating into a second segment.
    session.on_audio_frame(&samples_for(6000, true)).await.unwrap();
    // Tail silence closes the second segment.
    session.on_audio_frame(&samples_for(400, false)).await.unwrap();

    let mut asr_updates = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(OutboundEvent::AsrUpdate { .. })) =
            tokio::time::timeout(Duration::from_millis(200), session.drain_outbound()).await
        {
            asr_updates += 1;
            if asr_updates >= 2 {
                break;
            }
        }
    }
    assert!(asr_updates >= 2, "expected at least two ASR calls from forced segment cuts");
}

async fn session_history(session: &Session) -> Vec<(&'static str, String)> {
    session
        .history()
        .await
        .into_iter()
        .map(|entry| {
            let role = match entry.role {
                voice_core::events::Role::User => "user",
                voice_core::events::Role::Assistant => "assistant",
            };
            (role, entry.text)
        })
        .collect()
}
