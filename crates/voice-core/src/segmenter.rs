//! Consumes (window, speech-probability) decisions from VAD and produces
//! discrete utterance segments delimited by speech-start and
//! end-of-speech, per the state table in the component design.

use crate::events::{AudioFrame, SpeechSegment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    InSpeech,
}

#[derive(Debug, Clone)]
pub enum SegmenterEvent {
    /// A new segment opened. Also the barge-in signal: the Orchestrator
    /// must cancel any active reply turn when it observes this.
    SpeechStarted,
    /// The segment closed, either by silence timeout or forced cut-off
    /// at `max_segment_ms`.
    EndOfSpeech {
        segment: SpeechSegment,
        forced: bool,
    },
}

pub struct SegmenterConfig {
    pub sample_rate: u32,
    pub threshold: f32,
    pub eos_silence_ms: u64,
    pub max_segment_ms: u64,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            threshold: 0.5,
            eos_silence_ms: 1200,
            max_segment_ms: 5000,
        }
    }
}

pub struct TurnSegmenter {
    config: SegmenterConfig,
    state: State,
    segment: SpeechSegment,
    silence_ms: u64,
    segment_ms: u64,
    next_offset: u64,
}

impl TurnSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self {
            config,
            state: State::Idle,
            segment: SpeechSegment::default(),
            silence_ms: 0,
            segment_ms: 0,
            next_offset: 0,
        }
    }

    fn window_ms(&self, window: &AudioFrame) -> u64 {
        (window.samples.len() as u64 * 1000) / self.config.sample_rate as u64
    }

    /// Feeds one window and its VAD probability through the state
    /// machine, returning any events it produced (at most two: an
    /// `EndOfSpeech` followed by a `SpeechStarted` cannot both occur for
    /// a single window under this table, so this returns 0 or 1 events).
    pub fn process(&mut self, window: AudioFrame, probability: f32) -> Option<SegmenterEvent> {
        let is_speech = probability >= self.config.threshold;
        let dur_ms = self.window_ms(&window);

        match (self.state, is_speech) {
            (State::Idle, true) => {
                self.state = State::InSpeech;
                self.segment = SpeechSegment {
                    samples: window.samples,
                    start_offset: self.next_offset,
                    end_offset: self.next_offset,
                };
                self.silence_ms = 0;
                self.segment_ms = dur_ms;
                self.next_offset += dur_ms;
                Some(SegmenterEvent::SpeechStarted)
            }
            (State::Idle, false) => {
                self.next_offset += dur_ms;
                None
            }
            (State::InSpeech, true) => {
                self.segment.samples.extend_from_slice(&window.samples);
                self.silence_ms = 0;
                self.segment_ms += dur_ms;
                self.next_offset += dur_ms;
                self.maybe_force_close()
            }
            (State::InSpeech, false) => {
                self.segment.samples.extend_from_slice(&window.samples);
                self.silence_ms += dur_ms;
                self.segment_ms += dur_ms;
                self.next_offset += dur_ms;
                if self.silence_ms >= self.config.eos_silence_ms {
                    Some(self.close_segment(false))
                } else {
                    self.maybe_force_close()
                }
            }
        }
    }

    /// Forces the current segment closed regardless of silence duration,
    /// for push-to-talk clients (`CLIENT_SPEECH_END`). A no-op in Idle.
    pub fn force_close(&mut self) -> Option<SegmenterEvent> {
        if self.state == State::InSpeech {
            Some(self.close_segment(false))
        } else {
            None
        }
    }

    fn maybe_force_close(&mut self) -> Option<SegmenterEvent> {
        if self.segment_ms >= self.config.max_segment_ms {
            Some(self.close_segment(true))
        } else {
            None
        }
    }

    fn close_segment(&mut self, forced: bool) -> SegmenterEvent {
        self.state = State::Idle;
        let mut segment = std::mem::take(&mut self.segment);
        segment.end_offset = self.next_offset;
        self.silence_ms = 0;
        self.segment_ms = 0;
        SegmenterEvent::EndOfSpeech { segment, forced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(n: usize) -> AudioFrame {
        AudioFrame {
            samples: vec![0i16; n],
            offset: 0,
        }
    }

    fn cfg() -> SegmenterConfig {
        SegmenterConfig {
            sample_rate: 1000,
            threshold: 0.5,
            eos_silence_ms: 300,
            max_segment_ms: 1000,
        }
    }

    #[test]
    fn opens_and_closes_on_silence() {
        let mut seg = TurnSegmenter::new(cfg());
        let started = seg.process(window(100), 1.0);
        assert!(matches!(started, Some(SegmenterEvent::SpeechStarted)));

        assert!(seg.process(window(100), 0.0).is_none());
        assert!(seg.process(window(100), 0.0).is_none());
        let closed = seg.process(window(100), 0.0).unwrap();
        match closed {
            SegmenterEvent::EndOfSpeech { forced, segment } => {
                assert!(!forced);
                assert_eq!(segment.samples.len(), 400);
            }
            _ => panic!("expected EndOfSpeech"),
        }
    }

    #[test]
    fn force_closes_at_max_segment() {
        let mut seg = TurnSegmenter::new(cfg());
        assert!(seg.process(window(100), 1.0).is_some());
        for _ in 0..8 {
            let ev = seg.process(window(100), 1.0);
            if let Some(SegmenterEvent::EndOfSpeech { forced, .. }) = ev {
                assert!(forced);
                return;
            }
        }
        panic!("expected a forced EndOfSpeech before 9 windows");
    }

    #[test]
    fn silence_resets_on_resumed_speech() {
        let mut seg = TurnSegmenter::new(cfg());
        seg.process(window(100), 1.0);
        seg.process(window(100), 0.0); // silence 100ms
        seg.process(window(100), 1.0); // resumes, resets silence counter
        assert!(seg.process(window(100), 0.0).is_none());
        assert!(seg.process(window(100), 0.0).is_none());
        assert!(seg.process(window(100), 0.0).is_some());
    }
}
