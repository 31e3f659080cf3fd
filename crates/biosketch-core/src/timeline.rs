//! Drawing timeline for one response cycle.
//!
//! Audio length is never measured: the duration is estimated from the reply text,
//! so drawings line up with speech only approximately.

use serde::{Deserialize, Serialize};

/// Characters spoken per second in the duration estimate.
const CHARS_PER_SECOND: f64 = 20.0;

/// Padding added to every estimate, in seconds.
const DURATION_PADDING_SECS: f64 = 2.0;

/// One cue: show `drawing` at `time` seconds into the response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub time: f64,
    pub drawing: String,
}

impl TimelineEvent {
    pub fn new(time: f64, drawing: impl Into<String>) -> Self {
        Self {
            time,
            drawing: drawing.into(),
        }
    }
}

/// Estimated speech duration of `text`, in seconds.
pub fn estimate_duration(text: &str) -> f64 {
    text.chars().count() as f64 / CHARS_PER_SECOND + DURATION_PADDING_SECS
}

/// Ordered cue list with a total duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    events: Vec<TimelineEvent>,
    duration: f64,
}

impl Timeline {
    /// Build a timeline; events are sorted by time (stable) and negative or
    /// non-finite times are clamped to zero. Cues past `duration` are squeezed
    /// proportionally so the last one lands on it; the duration itself is kept.
    pub fn new(mut events: Vec<TimelineEvent>, duration: f64) -> Self {
        for event in &mut events {
            if !event.time.is_finite() || event.time < 0.0 {
                event.time = 0.0;
            }
        }
        events.sort_by(|a, b| a.time.total_cmp(&b.time));
        let duration = if duration.is_finite() && duration > 0.0 { duration } else { 0.0 };
        let last = events.last().map(|e| e.time).unwrap_or(0.0);
        if last > duration {
            let scale = duration / last;
            for event in &mut events {
                event.time = (event.time * scale).min(duration);
            }
        }
        Self { events, duration }
    }

    /// Timeline whose duration is estimated from the text that will be spoken.
    pub fn for_text(events: Vec<TimelineEvent>, text: &str) -> Self {
        Self::new(events, estimate_duration(text))
    }

    /// Evenly spaced cues, `step` seconds apart.
    pub fn stepped<I, S>(drawings: I, step: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let events: Vec<TimelineEvent> = drawings
            .into_iter()
            .enumerate()
            .map(|(i, d)| TimelineEvent::new(i as f64 * step, d))
            .collect();
        let duration = events.len() as f64 * step;
        Self::new(events, duration)
    }

    pub fn events(&self) -> &[TimelineEvent] {
        &self.events
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drawing on screen at `at` seconds: the latest cue not after `at`.
    pub fn current_drawing(&self, at: f64) -> Option<&str> {
        self.events
            .iter()
            .take_while(|e| e.time <= at)
            .last()
            .map(|e| e.drawing.as_str())
    }

    /// Cues whose time falls in `[from, to)`.
    pub fn due(&self, from: f64, to: f64) -> impl Iterator<Item = &TimelineEvent> {
        self.events
            .iter()
            .filter(move |e| e.time >= from && e.time < to)
    }

    /// Number of markers reached at `at`.
    pub fn markers_passed(&self, at: f64) -> usize {
        self.events.iter().filter(|e| e.time <= at).count()
    }

    /// Playback progress in percent, clamped to `0..=100`.
    pub fn progress(&self, at: f64) -> f64 {
        if self.duration <= 0.0 {
            return 100.0;
        }
        (at / self.duration * 100.0).clamp(0.0, 100.0)
    }

    /// Position of a marker along the track, in percent.
    pub fn marker_position(&self, event: &TimelineEvent) -> f64 {
        if self.duration <= 0.0 {
            return 0.0;
        }
        (event.time / self.duration * 100.0).clamp(0.0, 100.0)
    }

    /// Unique drawing keys in first-appearance order.
    pub fn drawings(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for e in &self.events {
            if !seen.contains(&e.drawing.as_str()) {
                seen.push(&e.drawing);
            }
        }
        seen
    }

    /// `"1.5s / 6.0s"` style readout.
    pub fn readout(&self, at: f64) -> String {
        format!("{:.1}s / {:.1}s", at.clamp(0.0, self.duration), self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Timeline {
        Timeline::new(
            vec![
                TimelineEvent::new(4.0, "bacterias"),
                TimelineEvent::new(0.0, "probiotico"),
                TimelineEvent::new(2.0, "intestino"),
            ],
            10.0,
        )
    }

    #[test]
    fn events_are_sorted() {
        let t = sample();
        let keys: Vec<_> = t.events().iter().map(|e| e.drawing.as_str()).collect();
        assert_eq!(keys, vec!["probiotico", "intestino", "bacterias"]);
    }

    #[test]
    fn current_drawing_follows_cues() {
        let t = sample();
        assert_eq!(t.current_drawing(0.0), Some("probiotico"));
        assert_eq!(t.current_drawing(1.99), Some("probiotico"));
        assert_eq!(t.current_drawing(2.0), Some("intestino"));
        assert_eq!(t.current_drawing(9.0), Some("bacterias"));
        assert_eq!(Timeline::new(vec![], 1.0).current_drawing(0.5), None);
    }

    #[test]
    fn duration_estimate_uses_text_length() {
        let text = "a".repeat(40);
        assert!((estimate_duration(&text) - 4.0).abs() < 1e-9);
        assert!((estimate_duration("") - 2.0).abs() < 1e-9);
    }

    #[test]
    fn late_cues_are_rescaled_into_the_estimate() {
        // "hola" is spoken in 2.2 s
        let t = Timeline::for_text(
            vec![
                TimelineEvent::new(0.0, "probiotico"),
                TimelineEvent::new(6.0, "intestino"),
                TimelineEvent::new(12.0, "alivio"),
            ],
            "hola",
        );
        assert!((t.duration() - 2.2).abs() < 1e-9);
        let times: Vec<f64> = t.events().iter().map(|e| e.time).collect();
        assert_eq!(times[0], 0.0);
        assert!((times[1] - 1.1).abs() < 1e-9);
        assert!((times[2] - 2.2).abs() < 1e-9);
    }

    #[test]
    fn cues_inside_the_estimate_are_untouched() {
        let t = Timeline::new(vec![TimelineEvent::new(1.5, "gases")], 4.0);
        assert_eq!(t.events()[0].time, 1.5);
        assert_eq!(t.duration(), 4.0);
    }

    #[test]
    fn huge_cue_time_stays_within_duration() {
        let t = Timeline::new(
            vec![TimelineEvent::new(0.0, "probiotico"), TimelineEvent::new(1e20, "intestino")],
            3.0,
        );
        assert_eq!(t.events()[0].time, 0.0);
        assert!(t.events()[1].time <= 3.0);
        assert_eq!(t.duration(), 3.0);
    }

    #[test]
    fn unusable_duration_collapses_cues_to_start() {
        let t = Timeline::new(vec![TimelineEvent::new(5.0, "reloj")], f64::INFINITY);
        assert_eq!(t.duration(), 0.0);
        assert_eq!(t.events()[0].time, 0.0);
    }

    #[test]
    fn progress_and_markers() {
        let t = sample();
        assert_eq!(t.progress(5.0), 50.0);
        assert_eq!(t.progress(50.0), 100.0);
        assert_eq!(t.markers_passed(2.0), 2);
        assert_eq!(t.due(1.0, 4.0).count(), 1);
        assert_eq!(t.readout(2.5), "2.5s / 10.0s");
    }

    #[test]
    fn bad_times_clamp_to_zero() {
        let t = Timeline::new(
            vec![TimelineEvent::new(f64::NAN, "reloj"), TimelineEvent::new(-3.0, "escudo")],
            1.0,
        );
        assert!(t.events().iter().all(|e| e.time == 0.0));
    }

    #[test]
    fn stepped_spacing() {
        let t = Timeline::stepped(["gases", "alivio", "gases"], 2.0);
        assert_eq!(t.events()[1].time, 2.0);
        assert_eq!(t.duration(), 6.0);
        assert_eq!(t.drawings(), vec!["gases", "alivio"]);
    }
}
