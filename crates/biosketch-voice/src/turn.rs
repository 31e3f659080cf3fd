//! Turn gap logic: an utterance ends after 800ms of silence following speech.
//!
//! Time is passed in by the caller (the capture timestamp of each chunk), so the
//! detector has no clock of its own.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Silence after speech before the turn is committed (default: 800ms).
    pub silence_gap: Duration,
    /// Shorter utterances are dropped (default: 200ms).
    pub min_speech: Duration,
    /// Commit regardless of silence once a turn runs this long (default: 30s).
    pub max_turn: Duration,
    pub sample_rate: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            silence_gap: Duration::from_millis(800),
            min_speech: Duration::from_millis(200),
            max_turn: Duration::from_secs(30),
            sample_rate: 16000,
        }
    }
}

/// One finished utterance, ready for transcription.
#[derive(Debug, Clone)]
pub struct AudioTurn {
    /// Mono f32 PCM from speech start to the last speech frame.
    pub samples: Vec<f32>,
    pub timestamp: DateTime<Utc>,
    pub duration: Duration,
    pub sample_rate: u32,
}

#[derive(Debug, Clone)]
pub enum TurnUpdate {
    /// Speech began.
    Started,
    /// Gap (or max length) reached on a long enough utterance.
    Committed(AudioTurn),
    /// Gap reached but the utterance was too short.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnState {
    Idle,
    Speaking,
    Gap,
}

/// Folds per-frame VAD decisions into utterances.
pub struct TurnDetector {
    config: TurnConfig,
    state: TurnState,
    speech_start: Option<Instant>,
    last_speech: Option<Instant>,
    buffer: Vec<f32>,
}

impl TurnDetector {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            config,
            state: TurnState::Idle,
            speech_start: None,
            last_speech: None,
            buffer: Vec::new(),
        }
    }

    /// Feed one frame's VAD decision and samples, captured at `now`.
    pub fn process(&mut self, is_speech: bool, frame: &[f32], now: Instant) -> Option<TurnUpdate> {
        match (self.state, is_speech) {
            (TurnState::Idle, true) => {
                self.state = TurnState::Speaking;
                self.speech_start = Some(now);
                self.last_speech = Some(now);
                self.buffer.clear();
                self.buffer.extend_from_slice(frame);
                debug!("speech started");
                Some(TurnUpdate::Started)
            }
            (TurnState::Idle, false) => None,
            (TurnState::Speaking, true) | (TurnState::Gap, true) => {
                self.state = TurnState::Speaking;
                self.last_speech = Some(now);
                self.buffer.extend_from_slice(frame);
                let elapsed = self.speech_start.map(|s| now.duration_since(s)).unwrap_or_default();
                if elapsed >= self.config.max_turn {
                    info!("max turn length reached; committing");
                    return Some(self.commit());
                }
                None
            }
            (TurnState::Speaking, false) => {
                // Trailing silence is kept so the utterance does not end abruptly.
                self.state = TurnState::Gap;
                self.buffer.extend_from_slice(frame);
                None
            }
            (TurnState::Gap, false) => {
                self.buffer.extend_from_slice(frame);
                let silent_for = self.last_speech.map(|t| now.duration_since(t)).unwrap_or_default();
                if silent_for >= self.config.silence_gap {
                    return Some(self.commit());
                }
                None
            }
        }
    }

    /// True while an utterance is open (speaking or inside the gap).
    pub fn in_turn(&self) -> bool {
        self.state != TurnState::Idle
    }

    /// Samples buffered for the open utterance.
    pub fn pending(&self) -> &[f32] {
        &self.buffer
    }

    fn commit(&mut self) -> TurnUpdate {
        let duration = match (self.speech_start, self.last_speech) {
            (Some(start), Some(last)) => last.duration_since(start),
            _ => Duration::ZERO,
        };
        let samples = std::mem::take(&mut self.buffer);
        self.reset();
        if duration < self.config.min_speech {
            debug!(?duration, "utterance too short; dropped");
            return TurnUpdate::Dropped;
        }
        info!(?duration, samples = samples.len(), "🎯 turn committed");
        TurnUpdate::Committed(AudioTurn {
            samples,
            timestamp: Utc::now(),
            duration,
            sample_rate: self.config.sample_rate,
        })
    }

    fn reset(&mut self) {
        self.state = TurnState::Idle;
        self.speech_start = None;
        self.last_speech = None;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(30);

    /// Feed `n` frames starting at `*t`, advancing it. Returns the last non-None update.
    fn feed(d: &mut TurnDetector, t: &mut Instant, speech: bool, n: usize) -> Option<TurnUpdate> {
        let mut last = None;
        for _ in 0..n {
            if let Some(u) = d.process(speech, &[0.1; 480], *t) {
                last = Some(u);
            }
            *t += FRAME;
        }
        last
    }

    #[test]
    fn commits_after_gap() {
        let mut d = TurnDetector::new(TurnConfig::default());
        let mut t = Instant::now();
        assert!(matches!(feed(&mut d, &mut t, true, 1), Some(TurnUpdate::Started)));
        feed(&mut d, &mut t, true, 20);
        assert!(d.in_turn());
        // 800ms of silence is 27 frames after the last speech frame.
        let update = feed(&mut d, &mut t, false, 30);
        match update {
            Some(TurnUpdate::Committed(turn)) => {
                assert_eq!(turn.duration, FRAME * 20);
                assert!(!turn.samples.is_empty());
            }
            other => panic!("expected commit, got {:?}", other),
        }
        assert!(!d.in_turn());
    }

    #[test]
    fn short_blip_is_dropped() {
        let mut d = TurnDetector::new(TurnConfig::default());
        let mut t = Instant::now();
        feed(&mut d, &mut t, true, 2);
        assert!(matches!(feed(&mut d, &mut t, false, 40), Some(TurnUpdate::Dropped)));
    }

    #[test]
    fn resumed_speech_keeps_turn_open() {
        let mut d = TurnDetector::new(TurnConfig::default());
        let mut t = Instant::now();
        feed(&mut d, &mut t, true, 10);
        assert!(feed(&mut d, &mut t, false, 10).is_none());
        assert!(feed(&mut d, &mut t, true, 10).is_none());
        assert!(d.in_turn());
        assert_eq!(d.pending().len(), 30 * 480);
    }

    #[test]
    fn max_turn_forces_commit() {
        let config = TurnConfig {
            max_turn: Duration::from_millis(300),
            ..Default::default()
        };
        let mut d = TurnDetector::new(config);
        let mut t = Instant::now();
        // frames at 0..=300ms; the one at 300ms reaches the limit
        assert!(matches!(feed(&mut d, &mut t, true, 11), Some(TurnUpdate::Committed(_))));
    }
}
