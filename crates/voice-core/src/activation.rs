//! Wake-word activation gate: when `enable_prompt_activation` is set and
//! the session is inactive, user text without a keyword is not forwarded
//! to the LLM; a scripted prompt is emitted instead.

use std::time::{Duration, Instant};

pub struct ActivationConfig {
    pub enable_prompt_activation: bool,
    pub activation_keywords: Vec<String>,
    pub activation_timeout_seconds: u64,
    pub activation_reply: String,
    pub deactivation_reply: String,
}

impl Default for ActivationConfig {
    fn default() -> Self {
        Self {
            enable_prompt_activation: false,
            activation_keywords: Vec::new(),
            activation_timeout_seconds: 60,
            activation_reply: "I'm listening.".to_string(),
            deactivation_reply: "Going back to sleep.".to_string(),
        }
    }
}

/// Outcome of passing one user text through the gate.
pub enum GateOutcome {
    /// Activation disabled, or already active with no deactivation
    /// keyword present: forward this text (verbatim) to the LLM.
    Forward(String),
    /// Activation keyword found while inactive: emit the activation
    /// reply, then forward the remainder after the keyword (if any).
    Activated {
        reply: String,
        remainder: Option<String>,
    },
    /// Deactivated by keyword or timeout: emit the deactivation reply,
    /// nothing forwarded to the LLM.
    Deactivated { reply: String },
    /// Inactive and no keyword present: drop the input, emit the
    /// scripted prompt.
    Ignored { reply: String },
}

pub struct ActivationGate {
    config: ActivationConfig,
    active: bool,
    last_activity: Instant,
}

impl ActivationGate {
    pub fn new(config: ActivationConfig) -> Self {
        let active = !config.enable_prompt_activation;
        Self {
            config,
            active,
            last_activity: Instant::now(),
        }
    }

    fn timed_out(&self) -> bool {
        self.active
            && self.config.enable_prompt_activation
            && self.last_activity.elapsed()
                >= Duration::from_secs(self.config.activation_timeout_seconds)
    }

    fn find_keyword<'a>(&self, lower: &'a str) -> Option<(usize, usize)> {
        self.config
            .activation_keywords
            .iter()
            .filter_map(|kw| lower.find(&kw.to_lowercase()).map(|idx| (idx, kw.len())))
            .min_by_key(|(idx, _)| *idx)
    }

    /// Processes one piece of user text. Call before forwarding anything
    /// to the Orchestrator's LLM path.
    pub fn process(&mut self, text: &str) -> GateOutcome {
        if !self.config.enable_prompt_activation {
            return GateOutcome::Forward(text.to_string());
        }

        if self.timed_out() {
            self.active = false;
        }

        let lower = text.to_lowercase();

        if self.active {
            if let Some((idx, len)) = self.find_keyword(&lower) {
                // A keyword while already active deactivates (matches
                // the "explicit keyword" deactivation rule).
                self.active = false;
                let _ = (idx, len);
                return GateOutcome::Deactivated {
                    reply: self.config.deactivation_reply.clone(),
                };
            }
            self.last_activity = Instant::now();
            return GateOutcome::Forward(text.to_string());
        }

        match self.find_keyword(&lower) {
            Some((idx, len)) => {
                self.active = true;
                self.last_activity = Instant::now();
                let after = text[idx + len..].trim_start_matches([',', ':', '.', '!', '?', ' ']);
                GateOutcome::Activated {
                    reply: self.config.activation_reply.clone(),
                    remainder: if after.is_empty() {
                        None
                    } else {
                        Some(after.to_string())
                    },
                }
            }
            None => GateOutcome::Ignored {
                reply: self.config.deactivation_reply.clone(),
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ActivationConfig {
        ActivationConfig {
            enable_prompt_activation: true,
            activation_keywords: vec!["hello assistant".to_string()],
            activation_timeout_seconds: 60,
            activation_reply: "activated".to_string(),
            deactivation_reply: "deactivated".to_string(),
        }
    }

    #[test]
    fn ignores_input_without_keyword_while_inactive() {
        let mut gate = ActivationGate::new(cfg());
        let outcome = gate.process("tell me a joke");
        assert!(matches!(outcome, GateOutcome::Ignored { .. }));
    }

    #[test]
    fn activates_and_forwards_remainder() {
        let mut gate = ActivationGate::new(cfg());
        let outcome = gate.process("hello assistant, tell me a joke");
        match outcome {
            GateOutcome::Activated { remainder, .. } => {
                assert_eq!(remainder.as_deref(), Some("tell me a joke"));
            }
            _ => panic!("expected Activated"),
        }
    }

    #[test]
    fn forwards_normally_once_active() {
        let mut gate = ActivationGate::new(cfg());
        gate.process("hello assistant");
        let outcome = gate.process("what's the weather");
        assert!(matches!(outcome, GateOutcome::Forward(_)));
    }
}
