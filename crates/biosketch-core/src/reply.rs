//! Assistant replies and the parser that pulls drawing cues out of hosted-model text.
//!
//! The model is asked for a JSON object `{"text": ..., "events": [{"time": s, "drawing": key}]}`.
//! When it answers in prose instead, three older trailing formats are still recognised:
//!
//! - `TIMELINE: 0:probiotico, 2:intestino`
//! - `DIBUJOS: probiotico, intestino`
//! - inline `[VIZ:bacterias]` markers
//!
//! Anything else yields the default drawing at time zero with the text left untouched.

use crate::catalog::DEFAULT_DRAWING;
use crate::timeline::{Timeline, TimelineEvent};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Spacing, in seconds, given to cues that carry no explicit time.
pub const UNTIMED_STEP_SECS: f64 = 2.0;

static TIMELINE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"TIMELINE:[^\S\n]*([^\n]+?)\s*$").expect("timeline regex"));
static DIBUJOS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"DIBUJOS:[^\S\n]*([^\n]+?)\s*$").expect("dibujos regex"));
static VIZ_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[VIZ:(\w+)\]").expect("viz regex"));

/// Which encoding the drawing cues were found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyFormat {
    Json,
    Timeline,
    Dibujos,
    Viz,
    /// No cues found; default drawing used.
    Plain,
    /// Canned text from a local table.
    Canned,
}

/// Text to speak plus the drawing cues that go with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub text: String,
    pub events: Vec<TimelineEvent>,
    pub format: ReplyFormat,
}

impl AssistantReply {
    /// Reply from a local table; drawings are spaced `step` seconds apart.
    pub fn canned(text: impl Into<String>, drawings: &[String], step: f64) -> Self {
        let events = drawings
            .iter()
            .enumerate()
            .map(|(i, d)| TimelineEvent::new(i as f64 * step, d.clone()))
            .collect();
        Self {
            text: text.into(),
            events,
            format: ReplyFormat::Canned,
        }
    }

    /// Plain text with the default drawing.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            events: default_events(),
            format: ReplyFormat::Plain,
        }
    }

    /// Timeline with a duration estimated from the reply text.
    pub fn timeline(&self) -> Timeline {
        Timeline::for_text(self.events.clone(), &self.text)
    }

    /// Unique drawing keys in cue order.
    pub fn drawings(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for e in &self.events {
            if !out.contains(&e.drawing) {
                out.push(e.drawing.clone());
            }
        }
        out
    }
}

fn default_events() -> Vec<TimelineEvent> {
    vec![TimelineEvent::new(0.0, DEFAULT_DRAWING)]
}

#[derive(Deserialize)]
struct WireReply {
    text: String,
    #[serde(default)]
    events: Vec<WireEvent>,
}

#[derive(Deserialize)]
struct WireEvent {
    #[serde(default)]
    time: f64,
    drawing: String,
}

/// Parse a hosted-model reply. Never fails: unusable cues fall back to the default drawing.
pub fn parse_reply(raw: &str) -> AssistantReply {
    if let Some(reply) = parse_json(raw) {
        return reply;
    }
    if let Some(reply) = parse_timeline(raw) {
        return reply;
    }
    if let Some(reply) = parse_dibujos(raw) {
        return reply;
    }
    if let Some(reply) = parse_viz(raw) {
        return reply;
    }
    AssistantReply::plain(raw)
}

fn parse_json(raw: &str) -> Option<AssistantReply> {
    let body = strip_code_fence(raw.trim());
    if !body.starts_with('{') {
        return None;
    }
    let wire: WireReply = serde_json::from_str(body).ok()?;
    let text = wire.text.trim().to_string();
    if text.is_empty() {
        return None;
    }
    let mut events: Vec<TimelineEvent> = wire
        .events
        .into_iter()
        .filter_map(|e| {
            let key = clean_key(&e.drawing);
            (!key.is_empty()).then(|| TimelineEvent::new(e.time, key))
        })
        .collect();
    if events.is_empty() {
        events = default_events();
    }
    Some(AssistantReply {
        text,
        events,
        format: ReplyFormat::Json,
    })
}

fn strip_code_fence(s: &str) -> &str {
    let Some(rest) = s.strip_prefix("```") else {
        return s;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_timeline(raw: &str) -> Option<AssistantReply> {
    let caps = TIMELINE_RE.captures(raw)?;
    let whole = caps.get(0)?;
    let events: Vec<TimelineEvent> = caps[1]
        .split(',')
        .filter_map(|entry| {
            let (time, drawing) = entry.trim().split_once(':')?;
            let time: f64 = time.trim().trim_end_matches('s').parse().ok()?;
            let key = clean_key(drawing);
            (time.is_finite() && !key.is_empty()).then(|| TimelineEvent::new(time, key))
        })
        .collect();
    if events.is_empty() {
        return None;
    }
    Some(AssistantReply {
        text: raw[..whole.start()].trim().to_string(),
        events,
        format: ReplyFormat::Timeline,
    })
}

fn parse_dibujos(raw: &str) -> Option<AssistantReply> {
    let caps = DIBUJOS_RE.captures(raw)?;
    let whole = caps.get(0)?;
    let events: Vec<TimelineEvent> = caps[1]
        .split(',')
        .map(clean_key)
        .filter(|k| !k.is_empty())
        .enumerate()
        .map(|(i, k)| TimelineEvent::new(i as f64 * UNTIMED_STEP_SECS, k))
        .collect();
    if events.is_empty() {
        return None;
    }
    Some(AssistantReply {
        text: raw[..whole.start()].trim().to_string(),
        events,
        format: ReplyFormat::Dibujos,
    })
}

fn parse_viz(raw: &str) -> Option<AssistantReply> {
    let events: Vec<TimelineEvent> = VIZ_RE
        .captures_iter(raw)
        .enumerate()
        .map(|(i, c)| TimelineEvent::new(i as f64 * UNTIMED_STEP_SECS, clean_key(&c[1])))
        .collect();
    if events.is_empty() {
        return None;
    }
    Some(AssistantReply {
        text: strip_viz_markers(raw),
        events,
        format: ReplyFormat::Viz,
    })
}

/// Remove every `[VIZ:key]` marker and tidy the whitespace left behind.
pub fn strip_viz_markers(text: &str) -> String {
    VIZ_RE.replace_all(text, "").trim().to_string()
}

/// Lowercase a key and drop punctuation a model tends to wrap it in.
fn clean_key(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| matches!(c, '"' | '\'' | '[' | ']' | '.' | '`' | '*'))
        .trim()
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeline_suffix_is_parsed_and_stripped() {
        let raw = "Entiendo tu molestia.\n\nLas bacterias buenas ayudan.\nTIMELINE: 0:probiotico, 2:intestino";
        let reply = parse_reply(raw);
        assert_eq!(reply.format, ReplyFormat::Timeline);
        assert_eq!(
            reply.events,
            vec![
                TimelineEvent::new(0.0, "probiotico"),
                TimelineEvent::new(2.0, "intestino")
            ]
        );
        assert_eq!(reply.text, "Entiendo tu molestia.\n\nLas bacterias buenas ayudan.");
    }

    #[test]
    fn plain_text_gets_default_event_and_is_unchanged() {
        let raw = "  Hola, ¿en qué puedo ayudarte?  ";
        let reply = parse_reply(raw);
        assert_eq!(reply.format, ReplyFormat::Plain);
        assert_eq!(reply.text, raw);
        assert_eq!(reply.events, vec![TimelineEvent::new(0.0, "probiotico")]);
    }

    #[test]
    fn malformed_timeline_keeps_full_text() {
        let raw = "Texto.\nTIMELINE: pronto, luego";
        let reply = parse_reply(raw);
        assert_eq!(reply.format, ReplyFormat::Plain);
        assert_eq!(reply.text, raw);
        assert_eq!(reply.drawings(), vec!["probiotico".to_string()]);
    }

    #[test]
    fn json_reply_is_preferred() {
        let raw = r#"```json
{"text": "Tu flora se equilibra.", "events": [{"time": 0, "drawing": "probiotico"}, {"time": 3.5, "drawing": "Equilibrio"}]}
```"#;
        let reply = parse_reply(raw);
        assert_eq!(reply.format, ReplyFormat::Json);
        assert_eq!(reply.text, "Tu flora se equilibra.");
        assert_eq!(reply.events[1], TimelineEvent::new(3.5, "equilibrio"));
    }

    #[test]
    fn json_without_events_uses_default() {
        let reply = parse_reply(r#"{"text": "Hola"}"#);
        assert_eq!(reply.format, ReplyFormat::Json);
        assert_eq!(reply.events, vec![TimelineEvent::new(0.0, "probiotico")]);
    }

    #[test]
    fn dibujos_suffix_is_spaced() {
        let reply = parse_reply("Te explico.\nDIBUJOS: estomago, gases, alivio");
        assert_eq!(reply.format, ReplyFormat::Dibujos);
        assert_eq!(reply.text, "Te explico.");
        let times: Vec<f64> = reply.events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 2.0, 4.0]);
    }

    #[test]
    fn viz_markers_are_collected_and_removed() {
        let reply = parse_reply("El probiótico ayuda a tu flora. [VIZ:bacterias] [VIZ:alivio]");
        assert_eq!(reply.format, ReplyFormat::Viz);
        assert_eq!(reply.text, "El probiótico ayuda a tu flora.");
        assert_eq!(reply.drawings(), vec!["bacterias".to_string(), "alivio".to_string()]);
    }

    #[test]
    fn runaway_cue_time_is_pulled_into_speech() {
        let reply = parse_reply("Hola.\nTIMELINE: 0:probiotico, 1e20:intestino");
        assert_eq!(reply.events[1].time, 1e20);
        let timeline = reply.timeline();
        let estimate = crate::timeline::estimate_duration("Hola.");
        assert_eq!(timeline.duration(), estimate);
        assert!(timeline.events().iter().all(|e| e.time <= estimate));
        assert_eq!(timeline.current_drawing(estimate), Some("intestino"));
    }

    #[test]
    fn canned_reply_spacing() {
        let drawings = vec!["gases".to_string(), "alivio".to_string()];
        let reply = AssistantReply::canned("texto", &drawings, 2.0);
        assert_eq!(reply.events[1].time, 2.0);
        assert_eq!(reply.format, ReplyFormat::Canned);
    }
}
