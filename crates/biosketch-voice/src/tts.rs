//! Spoken replies: hosted TTS with a local synthesizer fallback.
//!
//! [`ResponsePlayer::speak`] blocks (HTTP and playback are synchronous); call it from
//! `spawn_blocking` or a dedicated thread.

use crate::audio::AudioSink;
use crate::error::{VoiceError, VoiceResult};
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, warn};

const TTS_TIMEOUT: Duration = Duration::from_secs(60);

/// Hosted TTS voices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    /// Neutral
    Alloy,
    /// Male
    Echo,
    /// British
    Fable,
    /// Deep male
    Onyx,
    /// Young female
    #[default]
    Nova,
    /// Soft female
    Shimmer,
}

impl Voice {
    pub const ALL: [Voice; 6] = [
        Voice::Alloy,
        Voice::Echo,
        Voice::Fable,
        Voice::Onyx,
        Voice::Nova,
        Voice::Shimmer,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Voice::Alloy => "alloy",
            Voice::Echo => "echo",
            Voice::Fable => "fable",
            Voice::Onyx => "onyx",
            Voice::Nova => "nova",
            Voice::Shimmer => "shimmer",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Voice {
    type Err = VoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Voice::ALL
            .into_iter()
            .find(|v| v.as_str() == wanted)
            .ok_or_else(|| VoiceError::Config(format!("unknown voice '{}'", s)))
    }
}

/// Text in, encoded audio (MP3/WAV) out. An empty result means nothing to play.
pub trait TtsBackend: Send + Sync {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>>;

    fn name(&self) -> &'static str;
}

/// OpenAI-compatible `/audio/speech`.
#[derive(Debug, Clone)]
pub struct HostedTts {
    base_url: String,
    api_key: String,
    model: String,
    voice: Voice,
    speed: f32,
    client: reqwest::blocking::Client,
}

impl HostedTts {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(TTS_TIMEOUT)
            .build()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: "tts-1-hd".to_string(),
            voice: Voice::default(),
            speed: 1.0,
            client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = voice;
        self
    }

    /// Playback speed, clamped to the API's 0.25..=4.0.
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.clamp(0.25, 4.0);
        self
    }

    fn request_body(&self, text: &str) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "input": text,
            "voice": self.voice.as_str(),
            "response_format": "mp3",
            "speed": self.speed,
        })
    }
}

impl TtsBackend for HostedTts {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/audio/speech", self.base_url.trim_end_matches('/'));
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(text))
            .send()
            .map_err(|e| VoiceError::Tts(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Tts(format!("TTS API error {}: {}", status, body)));
        }
        let bytes = res.bytes().map_err(|e| VoiceError::Tts(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "hosted"
    }
}

/// Voice parameters for the local synthesizer.
#[derive(Debug, Clone)]
pub struct SynthVoice {
    /// Language / voice name passed to the synthesizer (`es`).
    pub language: String,
    /// Words per minute.
    pub rate: u32,
    /// 0-99, 50 is neutral.
    pub pitch: u32,
}

impl Default for SynthVoice {
    fn default() -> Self {
        Self {
            language: "es".to_string(),
            rate: 160,
            pitch: 50,
        }
    }
}

/// eSpeak NG (or a compatible binary) writing WAV to stdout.
#[derive(Debug, Clone)]
pub struct LocalSynth {
    program: String,
    voice: SynthVoice,
}

impl LocalSynth {
    pub fn new(voice: SynthVoice) -> Self {
        Self {
            program: "espeak-ng".to_string(),
            voice,
        }
    }

    /// Use another espeak-compatible binary (e.g. `espeak`).
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn args(&self, text: &str) -> Vec<String> {
        vec![
            "-v".to_string(),
            self.voice.language.clone(),
            "-s".to_string(),
            self.voice.rate.to_string(),
            "-p".to_string(),
            self.voice.pitch.min(99).to_string(),
            "--stdout".to_string(),
            text.to_string(),
        ]
    }
}

impl TtsBackend for LocalSynth {
    fn synthesize(&self, text: &str) -> VoiceResult<Vec<u8>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(Vec::new());
        }
        let output = Command::new(&self.program)
            .args(self.args(text))
            .output()
            .map_err(|e| VoiceError::Synth(format!("{}: {}", self.program, e)))?;
        if !output.status.success() {
            return Err(VoiceError::Synth(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Which path produced the audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechOutcome {
    Hosted,
    Local,
    /// Nothing played (silent mode, empty text, or every path failed).
    Skipped,
}

/// Speaks replies: primary backend, then the fallback, then silence.
pub struct ResponsePlayer {
    primary: Option<Box<dyn TtsBackend>>,
    fallback: Option<Box<dyn TtsBackend>>,
    sink: Option<Box<dyn AudioSink>>,
    speaking: AtomicBool,
}

impl ResponsePlayer {
    /// Hosted TTS with local fallback.
    pub fn hosted(hosted: HostedTts, local: LocalSynth, sink: Box<dyn AudioSink>) -> Self {
        Self::with_backends(Some(Box::new(hosted)), Some(Box::new(local)), Some(sink))
    }

    /// Local synthesizer only.
    pub fn local(local: LocalSynth, sink: Box<dyn AudioSink>) -> Self {
        Self::with_backends(Some(Box::new(local)), None, Some(sink))
    }

    /// No audio at all.
    pub fn silent() -> Self {
        Self::with_backends(None, None, None)
    }

    pub fn with_backends(
        primary: Option<Box<dyn TtsBackend>>,
        fallback: Option<Box<dyn TtsBackend>>,
        sink: Option<Box<dyn AudioSink>>,
    ) -> Self {
        Self {
            primary,
            fallback,
            sink,
            speaking: AtomicBool::new(false),
        }
    }

    /// True while a reply is being synthesized or played.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Interrupt playback.
    pub fn stop(&self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
    }

    /// Speak `text`. Never fails: each failure is logged and the next path is tried.
    pub fn speak(&self, text: &str) -> SpeechOutcome {
        let Some(sink) = &self.sink else {
            return SpeechOutcome::Skipped;
        };
        if text.trim().is_empty() {
            return SpeechOutcome::Skipped;
        }
        self.speaking.store(true, Ordering::SeqCst);
        let outcome = self.try_backends(sink.as_ref(), text);
        // completion resets the status
        self.speaking.store(false, Ordering::SeqCst);
        outcome
    }

    fn try_backends(&self, sink: &dyn AudioSink, text: &str) -> SpeechOutcome {
        for backend in self.primary.iter().chain(self.fallback.iter()) {
            let audio = match backend.synthesize(text) {
                Ok(a) if !a.is_empty() => a,
                Ok(_) => continue,
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "speech synthesis failed");
                    continue;
                }
            };
            match sink.play(&audio) {
                Ok(()) => {
                    info!(backend = backend.name(), bytes = audio.len(), "reply spoken");
                    return if backend.name() == "hosted" {
                        SpeechOutcome::Hosted
                    } else {
                        SpeechOutcome::Local
                    };
                }
                Err(e) => {
                    warn!(backend = backend.name(), error = %e, "playback failed");
                }
            }
        }
        SpeechOutcome::Skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct Canned(&'static str, VoiceResult<Vec<u8>>);

    impl TtsBackend for Canned {
        fn synthesize(&self, _text: &str) -> VoiceResult<Vec<u8>> {
            match &self.1 {
                Ok(b) => Ok(b.clone()),
                Err(e) => Err(VoiceError::Tts(e.to_string())),
            }
        }

        fn name(&self) -> &'static str {
            self.0
        }
    }

    #[derive(Default, Clone)]
    struct RecordingSink(Arc<Mutex<Vec<Vec<u8>>>>);

    impl AudioSink for RecordingSink {
        fn play(&self, bytes: &[u8]) -> VoiceResult<()> {
            self.0.lock().unwrap().push(bytes.to_vec());
            Ok(())
        }

        fn stop(&self) {}
    }

    #[test]
    fn voice_parses_all_names() {
        for v in Voice::ALL {
            assert_eq!(v.as_str().parse::<Voice>().unwrap(), v);
        }
        assert_eq!(" Shimmer ".parse::<Voice>().unwrap(), Voice::Shimmer);
        assert!("sage".parse::<Voice>().is_err());
        assert_eq!(Voice::default(), Voice::Nova);
    }

    #[test]
    fn hosted_request_body() {
        let tts = HostedTts::new("http://localhost", "k")
            .unwrap()
            .with_voice(Voice::Onyx)
            .with_speed(9.0);
        let body = tts.request_body("hola");
        assert_eq!(body["model"], "tts-1-hd");
        assert_eq!(body["voice"], "onyx");
        assert_eq!(body["speed"], 4.0);
        assert_eq!(body["response_format"], "mp3");
    }

    #[test]
    fn failed_hosted_falls_back_to_local() {
        let sink = RecordingSink::default();
        let player = ResponsePlayer::with_backends(
            Some(Box::new(Canned("hosted", Err(VoiceError::Tts("down".into()))))),
            Some(Box::new(Canned("local", Ok(vec![1, 2, 3])))),
            Some(Box::new(sink.clone())),
        );
        assert_eq!(player.speak("Hola"), SpeechOutcome::Local);
        assert_eq!(sink.0.lock().unwrap().as_slice(), &[vec![1u8, 2, 3]]);
        assert!(!player.is_speaking());
    }

    #[test]
    fn hosted_success_skips_fallback() {
        let sink = RecordingSink::default();
        let player = ResponsePlayer::with_backends(
            Some(Box::new(Canned("hosted", Ok(vec![9])))),
            Some(Box::new(Canned("local", Ok(vec![1])))),
            Some(Box::new(sink.clone())),
        );
        assert_eq!(player.speak("Hola"), SpeechOutcome::Hosted);
        assert_eq!(sink.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn silent_and_empty_are_skipped() {
        assert_eq!(ResponsePlayer::silent().speak("Hola"), SpeechOutcome::Skipped);
        let player = ResponsePlayer::with_backends(
            Some(Box::new(Canned("local", Ok(vec![1])))),
            None,
            Some(Box::new(RecordingSink::default())),
        );
        assert_eq!(player.speak("   "), SpeechOutcome::Skipped);
    }

    #[test]
    fn missing_synth_binary_errors() {
        let synth = LocalSynth::new(SynthVoice::default()).with_program("biosketch-no-such-synth");
        assert!(matches!(synth.synthesize("hola"), Err(VoiceError::Synth(_))));
        assert!(synth.args("hola").contains(&"--stdout".to_string()));
    }
}
