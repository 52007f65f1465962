//! LLM capability provider: `generate(system_prompt, history, user_text) ->
//! stream of token-text`, honoring caller cancellation.

use async_openai::config::OpenAIConfig;
use async_openai::types::{ChatCompletionRequestMessageArgs, CreateChatCompletionRequestArgs, Role};
use async_openai::Client;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::error::{VoiceError, VoiceResult};
use crate::events::{HistoryEntry, Role as HistoryRole};

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[HistoryEntry],
        user_text: &str,
        cancel: CancellationToken,
    ) -> VoiceResult<BoxStream<'static, VoiceResult<String>>>;
}

/// Deterministic, offline provider for tests: echoes a fixed reply split
/// into single-word chunks, honoring cancellation between chunks.
pub struct PlaceholderLlm {
    pub reply: String,
}

impl Default for PlaceholderLlm {
    fn default() -> Self {
        Self {
            reply: "Hi!".to_string(),
        }
    }
}

#[async_trait]
impl LlmProvider for PlaceholderLlm {
    async fn generate(
        &self,
        _system_prompt: &str,
        _history: &[HistoryEntry],
        _user_text: &str,
        cancel: CancellationToken,
    ) -> VoiceResult<BoxStream<'static, VoiceResult<String>>> {
        let words: Vec<String> = self
            .reply
            .split_inclusive(' ')
            .map(str::to_string)
            .collect();
        let stream = async_stream::stream! {
            for word in words {
                if cancel.is_cancelled() {
                    break;
                }
                yield Ok(word);
            }
        };
        Ok(Box::pin(stream))
    }
}

/// OpenAI-compatible streaming chat provider.
pub struct OpenAiLlm {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiLlm {
    pub fn new(api_base: Option<String>, api_key: String, model: String) -> Self {
        let mut cfg = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            cfg = cfg.with_api_base(base);
        }
        Self {
            client: Client::with_config(cfg),
            model,
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiLlm {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[HistoryEntry],
        user_text: &str,
        cancel: CancellationToken,
    ) -> VoiceResult<BoxStream<'static, VoiceResult<String>>> {
        let mut messages = vec![ChatCompletionRequestMessageArgs::default()
            .role(Role::System)
            .content(system_prompt)
            .build()
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?];
        for entry in history {
            let role = match entry.role {
                HistoryRole::User => Role::User,
                HistoryRole::Assistant => Role::Assistant,
            };
            messages.push(
                ChatCompletionRequestMessageArgs::default()
                    .role(role)
                    .content(entry.text.clone())
                    .build()
                    .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?,
            );
        }
        messages.push(
            ChatCompletionRequestMessageArgs::default()
                .role(Role::User)
                .content(user_text)
                .build()
                .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?,
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .build()
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| VoiceError::ProviderUnavailable(e.to_string()))?;

        let stream = async_stream::stream! {
            while let Some(item) = upstream.next().await {
                if cancel.is_cancelled() {
                    break;
                }
                match item {
                    Ok(response) => {
                        for choice in &response.choices {
                            if let Some(content) = &choice.delta.content {
                                yield Ok(content.clone());
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(VoiceError::ProviderTransient(e.to_string()));
                        break;
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn placeholder_stream_yields_all_words_uncancelled() {
        let llm = PlaceholderLlm::default();
        let cancel = CancellationToken::new();
        let mut stream = llm
            .generate("", &[], "hi", cancel)
            .await
            .unwrap();
        let mut joined = String::new();
        while let Some(chunk) = stream.next().await {
            joined.push_str(&chunk.unwrap());
        }
        assert_eq!(joined, "Hi!");
    }

    #[tokio::test]
    async fn placeholder_stream_stops_once_cancelled() {
        let llm = PlaceholderLlm {
            reply: "one two three four".to_string(),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut stream = llm.generate("", &[], "hi", cancel).await.unwrap();
        assert!(stream.next().await.is_none());
    }
}
