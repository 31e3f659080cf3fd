//! Speech-to-text for committed microphone turns.

use crate::audio::pcm_f32_to_wav;
use crate::error::{VoiceError, VoiceResult};
use crate::turn::AudioTurn;
use std::time::Duration;
use tracing::info;

const STT_TIMEOUT: Duration = Duration::from_secs(30);

/// Turns PCM into text. Returns an empty string when nothing was recognised.
pub trait SttBackend: Send + Sync {
    fn transcribe(&self, turn: &AudioTurn) -> VoiceResult<String>;
}

/// Always returns the same text. Stands in for recognition in tests and demos.
#[derive(Debug, Clone, Default)]
pub struct FixedStt {
    text: String,
}

impl FixedStt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl SttBackend for FixedStt {
    fn transcribe(&self, turn: &AudioTurn) -> VoiceResult<String> {
        if turn.samples.is_empty() {
            return Ok(String::new());
        }
        Ok(self.text.clone())
    }
}

/// OpenAI-compatible `/audio/transcriptions` with a fixed language hint.
#[derive(Debug, Clone)]
pub struct HostedStt {
    base_url: String,
    api_key: String,
    model: String,
    language: String,
    client: reqwest::blocking::Client,
}

impl HostedStt {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> VoiceResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(STT_TIMEOUT)
            .build()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: "whisper-1".to_string(),
            language: "es".to_string(),
            client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// ISO-639-1 language hint (`es`).
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl SttBackend for HostedStt {
    fn transcribe(&self, turn: &AudioTurn) -> VoiceResult<String> {
        if turn.samples.is_empty() {
            return Ok(String::new());
        }
        let wav = pcm_f32_to_wav(&turn.samples, turn.sample_rate);
        let url = format!("{}/audio/transcriptions", self.base_url.trim_end_matches('/'));
        let part = reqwest::blocking::multipart::Part::bytes(wav)
            .file_name("turn.wav")
            .mime_str("audio/wav")
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        let form = reqwest::blocking::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone());
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .map_err(|e| VoiceError::Stt(e.to_string()))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().unwrap_or_default();
            return Err(VoiceError::Stt(format!("STT API error {}: {}", status, body)));
        }
        let json: serde_json::Value = res.json().map_err(|e| VoiceError::Stt(e.to_string()))?;
        let text = json
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();
        info!(chars = text.chars().count(), "transcribed turn");
        Ok(text)
    }
}

#[cfg(feature = "whisper")]
mod whisper_stt {
    use super::*;
    use std::sync::Mutex;
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    /// On-device Whisper over a ggml model. Audio must be 16 kHz mono.
    pub struct WhisperStt {
        #[allow(dead_code)]
        context: WhisperContext,
        state: Mutex<whisper_rs::WhisperState>,
        language: String,
    }

    impl WhisperStt {
        pub fn new(model_path: &str, language: impl Into<String>) -> VoiceResult<Self> {
            let context = WhisperContext::new_with_params(model_path, WhisperContextParameters::default())
                .map_err(|e| VoiceError::Stt(format!("Whisper load failed: {}", e)))?;
            let state = context
                .create_state()
                .map_err(|e| VoiceError::Stt(format!("Whisper state init failed: {}", e)))?;
            Ok(Self {
                context,
                state: Mutex::new(state),
                language: language.into(),
            })
        }
    }

    impl SttBackend for WhisperStt {
        fn transcribe(&self, turn: &AudioTurn) -> VoiceResult<String> {
            if turn.samples.is_empty() {
                return Ok(String::new());
            }
            if turn.sample_rate != 16000 {
                return Err(VoiceError::Stt(format!(
                    "Whisper expects 16 kHz; got {} Hz",
                    turn.sample_rate
                )));
            }
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_no_timestamps(true);
            params.set_language(Some(&self.language));

            let mut state = self
                .state
                .lock()
                .map_err(|e| VoiceError::Stt(format!("Whisper lock poisoned: {}", e)))?;
            state
                .full(params, &turn.samples)
                .map_err(|e| VoiceError::Stt(format!("Whisper inference failed: {}", e)))?;
            let text = state
                .as_iter()
                .filter_map(|seg| seg.to_str().ok().map(str::to_string))
                .collect::<Vec<_>>()
                .join(" ")
                .trim()
                .to_string();
            Ok(text)
        }
    }
}

#[cfg(feature = "whisper")]
pub use whisper_stt::WhisperStt;

/// Best available recogniser: local Whisper when built with it and a model path is given,
/// otherwise the hosted endpoint.
pub fn create_stt(
    base_url: &str,
    api_key: &str,
    language: &str,
    whisper_model: Option<&str>,
) -> VoiceResult<Box<dyn SttBackend>> {
    #[cfg(feature = "whisper")]
    if let Some(path) = whisper_model.map(str::trim).filter(|p| !p.is_empty()) {
        match WhisperStt::new(path, language) {
            Ok(w) => return Ok(Box::new(w)),
            Err(e) => tracing::warn!(error = %e, "local Whisper unavailable; using hosted STT"),
        }
    }
    #[cfg(not(feature = "whisper"))]
    let _ = whisper_model;
    Ok(Box::new(HostedStt::new(base_url, api_key)?.with_language(language)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn turn(samples: Vec<f32>) -> AudioTurn {
        AudioTurn {
            samples,
            timestamp: Utc::now(),
            duration: Duration::from_millis(600),
            sample_rate: 16000,
        }
    }

    #[test]
    fn fixed_stt_returns_text_for_audio() {
        let stt = FixedStt::new("tengo gases");
        assert_eq!(stt.transcribe(&turn(vec![0.1; 480])).unwrap(), "tengo gases");
        assert_eq!(stt.transcribe(&turn(vec![])).unwrap(), "");
    }

    #[test]
    fn hosted_stt_skips_empty_turns() {
        let stt = HostedStt::new("http://127.0.0.1:9", "k").unwrap();
        assert_eq!(stt.transcribe(&turn(vec![])).unwrap(), "");
    }

    #[test]
    fn unreachable_hosted_stt_errors() {
        let stt = HostedStt::new("http://127.0.0.1:9", "k").unwrap().with_language("es");
        assert!(matches!(stt.transcribe(&turn(vec![0.1; 480])), Err(VoiceError::Stt(_))));
    }
}
