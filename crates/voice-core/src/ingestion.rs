//! Per-session ring buffer that accumulates PCM frames arriving from the
//! client and hands fixed-size windows to the VAD.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};

use crate::error::{VoiceError, VoiceResult};
use crate::events::AudioFrame;

/// Samples per window handed to the VAD. 512 samples @ 16 kHz is 32 ms.
pub const DEFAULT_WINDOW_SAMPLES: usize = 512;

/// Unconsumed backlog beyond which frames are dropped oldest-first.
pub const DEFAULT_BACKLOG_SECONDS: u32 = 10;

pub struct IngestionConfig {
    pub sample_rate: u32,
    pub window_samples: usize,
    pub backlog_seconds: u32,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            window_samples: DEFAULT_WINDOW_SAMPLES,
            backlog_seconds: DEFAULT_BACKLOG_SECONDS,
        }
    }
}

/// Accumulates arbitrary-length PCM frames and emits fixed-size windows
/// in arrival order. Backed by a lock-free SPSC ring buffer so the
/// decoder and the VAD thread never contend on a mutex.
pub struct AudioIngestion {
    producer: HeapProd<i16>,
    consumer: HeapCons<i16>,
    window_samples: usize,
    capacity: usize,
    window_buf: Vec<i16>,
}

/// Emitted when the backlog exceeded capacity and oldest samples were
/// discarded to make room for a new frame.
#[derive(Debug, Clone, Copy)]
pub struct BackpressureDropped {
    pub dropped_samples: usize,
}

impl AudioIngestion {
    pub fn new(config: &IngestionConfig) -> Self {
        let capacity = config.sample_rate as usize * config.backlog_seconds as usize;
        let rb = HeapRb::<i16>::new(capacity);
        let (producer, consumer) = rb.split();
        Self {
            producer,
            consumer,
            window_samples: config.window_samples,
            capacity,
            window_buf: Vec::with_capacity(config.window_samples),
        }
    }

    /// Pushes a raw little-endian PCM16 frame. Length must be a multiple
    /// of 2 bytes (one sample width); otherwise `InvalidFrame`.
    pub fn push_frame(&mut self, bytes: &[u8]) -> VoiceResult<Option<BackpressureDropped>> {
        if bytes.len() % 2 != 0 {
            return Err(VoiceError::InvalidFrame(format!(
                "frame length {} is not a multiple of 2",
                bytes.len()
            )));
        }
        let samples: Vec<i16> = bytes
            .chunks_exact(2)
            .map(|c| i16::from_le_bytes([c[0], c[1]]))
            .collect();
        Ok(self.push_samples(&samples))
    }

    pub fn push_samples(&mut self, samples: &[i16]) -> Option<BackpressureDropped> {
        let free = self.capacity - self.producer.occupied_len();
        let mut dropped = 0usize;
        if samples.len() > free {
            dropped = samples.len() - free;
            // Drop the oldest buffered samples first to make room.
            self.consumer.skip(dropped.min(self.consumer.occupied_len()));
        }
        self.producer.push_slice(samples);
        if dropped > 0 {
            Some(BackpressureDropped {
                dropped_samples: dropped,
            })
        } else {
            None
        }
    }

    /// Pops the next complete window, if one is available, preserving
    /// sample order. No allocation beyond the one reused `window_buf`.
    pub fn next_window(&mut self) -> Option<AudioFrame> {
        if self.consumer.occupied_len() < self.window_samples {
            return None;
        }
        self.window_buf.clear();
        self.window_buf.resize(self.window_samples, 0);
        let popped = self.consumer.pop_slice(&mut self.window_buf);
        debug_assert_eq!(popped, self.window_samples);
        Some(AudioFrame {
            samples: self.window_buf.clone(),
            offset: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> IngestionConfig {
        IngestionConfig {
            sample_rate: 16_000,
            window_samples: 4,
            backlog_seconds: 1,
        }
    }

    #[test]
    fn emits_windows_in_order() {
        let mut ing = AudioIngestion::new(&cfg());
        ing.push_samples(&[1, 2, 3, 4, 5, 6, 7, 8]);
        let w1 = ing.next_window().unwrap();
        assert_eq!(w1.samples, vec![1, 2, 3, 4]);
        let w2 = ing.next_window().unwrap();
        assert_eq!(w2.samples, vec![5, 6, 7, 8]);
        assert!(ing.next_window().is_none());
    }

    #[test]
    fn rejects_odd_length_frame() {
        let mut ing = AudioIngestion::new(&cfg());
        let err = ing.push_frame(&[0u8; 3]).unwrap_err();
        assert!(matches!(err, VoiceError::InvalidFrame(_)));
    }

    #[test]
    fn drops_oldest_under_backpressure() {
        let mut ing = AudioIngestion::new(&IngestionConfig {
            sample_rate: 4,
            window_samples: 2,
            backlog_seconds: 1,
        });
        let dropped = ing.push_samples(&[1, 2, 3, 4, 5, 6]);
        assert!(dropped.is_some());
        let w = ing.next_window().unwrap();
        assert_eq!(w.samples, vec![3, 4]);
    }
}
