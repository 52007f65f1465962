//! Voice Activity Detection: a capability provider (§6.3) that classifies
//! one fixed-size window of PCM samples as speech or silence.

use webrtc_vad::{SampleRate, Vad, VadMode};

use crate::error::{VoiceError, VoiceResult};

/// `detect(window) -> probability ∈ [0,1]`. Implementations may return a
/// soft probability or a hard 0.0/1.0 decision; the Segmenter only
/// compares against a configured threshold.
pub trait VadProvider: Send {
    fn detect(&mut self, window: &[i16]) -> VoiceResult<f32>;
    fn reset(&mut self);
}

pub struct VadConfig {
    pub sample_rate: u32,
    pub mode: u8,
    pub threshold: f32,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            mode: 2,
            threshold: 0.5,
        }
    }
}

pub fn is_speech(probability: f32, threshold: f32) -> bool {
    probability >= threshold
}

/// `webrtc-vad`-backed provider, the concrete implementation bundled
/// with this repository.
pub struct WebrtcVadProvider {
    vad: Vad,
    sample_rate: SampleRate,
    mode: VadMode,
}

impl WebrtcVadProvider {
    pub fn new(config: &VadConfig) -> VoiceResult<Self> {
        let sample_rate = match config.sample_rate {
            8_000 => SampleRate::Rate8kHz,
            16_000 => SampleRate::Rate16kHz,
            32_000 => SampleRate::Rate32kHz,
            48_000 => SampleRate::Rate48kHz,
            other => {
                return Err(VoiceError::Vad(format!(
                    "unsupported sample rate {other}"
                )))
            }
        };
        let mode = match config.mode {
            0 => VadMode::Quality,
            1 => VadMode::LowBitrate,
            2 => VadMode::Aggressive,
            3 => VadMode::VeryAggressive,
            other => return Err(VoiceError::Vad(format!("unsupported vad mode {other}"))),
        };
        Ok(Self {
            vad: Vad::new_with_rate_and_mode(sample_rate, mode),
            sample_rate,
            mode,
        })
    }
}

impl VadProvider for WebrtcVadProvider {
    fn detect(&mut self, window: &[i16]) -> VoiceResult<f32> {
        let is_voice = self
            .vad
            .is_voice_segment(window)
            .map_err(|_| VoiceError::Vad("webrtc-vad rejected frame length".into()))?;
        Ok(if is_voice { 1.0 } else { 0.0 })
    }

    fn reset(&mut self) {
        // webrtc-vad has no reset API; recreate the detector instead.
        self.vad = Vad::new_with_rate_and_mode(self.sample_rate, self.mode);
    }
}

/// Deterministic, offline provider for tests: a fixed decision, or an
/// energy threshold over the window if `use_energy` is set.
pub struct PlaceholderVad {
    pub fixed_decision: Option<f32>,
    pub use_energy: bool,
    pub energy_threshold: f32,
}

impl Default for PlaceholderVad {
    fn default() -> Self {
        Self {
            fixed_decision: None,
            use_energy: true,
            energy_threshold: 200.0,
        }
    }
}

impl VadProvider for PlaceholderVad {
    fn detect(&mut self, window: &[i16]) -> VoiceResult<f32> {
        if let Some(fixed) = self.fixed_decision {
            return Ok(fixed);
        }
        if window.is_empty() {
            return Ok(0.0);
        }
        let rms = {
            let sum_sq: f64 = window.iter().map(|&s| (s as f64) * (s as f64)).sum();
            (sum_sq / window.len() as f64).sqrt()
        };
        Ok(if rms >= self.energy_threshold as f64 {
            1.0
        } else {
            0.0
        })
    }

    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_silence_is_below_threshold() {
        let mut vad = PlaceholderVad::default();
        let window = vec![0i16; 512];
        let p = vad.detect(&window).unwrap();
        assert!(!is_speech(p, 0.5));
    }

    #[test]
    fn placeholder_loud_window_is_speech() {
        let mut vad = PlaceholderVad::default();
        let window = vec![5000i16; 512];
        let p = vad.detect(&window).unwrap();
        assert!(is_speech(p, 0.5));
    }
}
