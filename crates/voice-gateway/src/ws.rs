//! WebSocket transport: the concrete mediator between a remote client and
//! one Session. Binary frames carry PCM, text frames carry the §6.1/§6.2
//! JSON event protocol.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use voice_core::activation::{ActivationConfig, ActivationGate};
use voice_core::capability_registry::ProviderConfig;
use voice_core::events::OutboundEvent;
use voice_core::orchestrator::OrchestratorConfig;
use voice_core::segmenter::SegmenterConfig;
use voice_core::session::{Session, SessionConfig};
use voice_core::VoiceError;

use crate::config as gw_config;
use crate::events_wire::{self, ClientEvent, RawClientEvent};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let Some(session) = await_session_start(&mut ws_tx, &mut ws_rx, &state).await else {
        return;
    };

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::channel::<OutboundEvent>(64);
    let session_for_drain = session.clone();
    let drain_task = tokio::spawn(async move {
        while let Some(event) = session_for_drain.drain_outbound().await {
            if outbound_tx.send(event).await.is_err() {
                break;
            }
        }
    });

    let sender_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(_) => continue,
            };
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(message)) = ws_rx.next().await {
        match message {
            Message::Binary(bytes) => {
                if let Err(err) = session.on_audio_frame(&bytes).await {
                    tracing::warn!(session_id = %session.id, error = %err, "audio frame error");
                    session.emit_error(&err).await;
                }
            }
            Message::Text(text) => {
                if let Err(err) = handle_text_message(&session, &text).await {
                    tracing::warn!(session_id = %session.id, error = %err, "protocol error");
                    session.emit_error(&err).await;
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    session.close().await;
    state.registry.destroy(&session.id).await;
    drain_task.abort();
    sender_task.abort();
}

async fn handle_text_message(session: &Arc<Session>, text: &str) -> Result<(), VoiceError> {
    let raw: RawClientEvent = serde_json::from_str(text)
        .map_err(|e| VoiceError::ProtocolViolation(format!("malformed JSON event: {e}")))?;
    let event = events_wire::parse(&raw)?;

    match event {
        ClientEvent::TextInput { text, .. } => {
            session.on_text_input(text).await?;
        }
        ClientEvent::SpeechEnd => {
            session.on_speech_end().await?;
        }
        ClientEvent::SessionStart { .. } => {
            // A second SESSION_START on an already-attached socket is a
            // no-op; the session was created on the first one.
        }
        ClientEvent::ConfigGet | ClientEvent::ConfigSet(_) | ClientEvent::ModuleStatusGet => {
            // Config/status introspection is transport-level bookkeeping,
            // not part of the dialog pipeline core.
        }
    }
    Ok(())
}

/// Waits for the mandatory first message, `SYSTEM_CLIENT_SESSION_START`,
/// creates the Session, and replies with its assigned id.
async fn await_session_start(
    ws_tx: &mut futures::stream::SplitSink<WebSocket, Message>,
    ws_rx: &mut futures::stream::SplitStream<WebSocket>,
    state: &AppState,
) -> Option<Arc<Session>> {
    while let Some(Ok(message)) = ws_rx.next().await {
        let Message::Text(text) = message else { continue };
        let Ok(raw) = serde_json::from_str::<RawClientEvent>(&text) else {
            continue;
        };
        if raw.event_type != "SYSTEM_CLIENT_SESSION_START" {
            continue;
        }

        let id = voice_core::SessionRegistry::next_id(raw.session_id.clone());
        let session = Arc::new(build_session(id.clone(), state));
        state.registry.insert(session.clone());

        let ack = OutboundEvent::SessionStart {
            session_id: id.clone(),
        };
        if let Ok(payload) = serde_json::to_string(&ack) {
            let _ = ws_tx.send(Message::Text(payload)).await;
        }
        return Some(session);
    }
    None
}

fn build_session(id: String, state: &AppState) -> Session {
    let cfg = &state.app_config;

    let vad_cfg = ProviderConfig {
        adapter_type: cfg.modules.vad.adapter_type.clone(),
        api_key: gw_config::resolve_api_key(cfg.modules.vad.api_key_env_var.as_deref()),
        api_base: None,
        model: None,
    };
    let asr_cfg = ProviderConfig {
        adapter_type: cfg.modules.asr.adapter_type.clone(),
        api_key: gw_config::resolve_api_key(cfg.modules.asr.api_key_env_var.as_deref()),
        api_base: None,
        model: None,
    };
    let llm_cfg = ProviderConfig {
        adapter_type: cfg.modules.llm.adapter_type.clone(),
        api_key: gw_config::resolve_api_key(cfg.modules.llm.api_key_env_var.as_deref()),
        api_base: None,
        model: None,
    };
    let tts_cfg = ProviderConfig {
        adapter_type: cfg.modules.tts.adapter_type.clone(),
        api_key: gw_config::resolve_api_key(cfg.modules.tts.api_key_env_var.as_deref()),
        api_base: None,
        model: None,
    };

    let vad = state
        .capability_registry
        .create_vad(&vad_cfg)
        .expect("vad adapter_type must be registered");
    let asr = state
        .capability_registry
        .create_asr(&asr_cfg)
        .expect("asr adapter_type must be registered");
    let llm = state
        .capability_registry
        .create_llm(&llm_cfg)
        .expect("llm adapter_type must be registered");
    let tts = state
        .capability_registry
        .create_tts(&tts_cfg)
        .expect("tts adapter_type must be registered");

    let activation = ActivationGate::new(ActivationConfig {
        enable_prompt_activation: cfg.activation_settings.enable_prompt_activation,
        activation_keywords: cfg.activation_settings.activation_keywords.clone(),
        activation_timeout_seconds: cfg.activation_settings.activation_timeout_seconds,
        activation_reply: cfg.activation_settings.activation_reply.clone(),
        deactivation_reply: cfg.activation_settings.deactivation_reply.clone(),
    });

    Session::new(
        id,
        SessionConfig {
            segmenter: SegmenterConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            ..SessionConfig::default()
        },
        vad,
        asr,
        llm,
        tts,
        activation,
        64,
    )
}
