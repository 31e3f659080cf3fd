//! Studio configuration: defaults → optional `biosketch.toml` → `BIOSKETCH_*` environment.
//!
//! | Key / Env | Default | Description |
//! |-----------|---------|-------------|
//! | mode / BIOSKETCH_MODE | symptom | `keyword`, `symptom`, `hosted` or `streaming` |
//! | api_key / BIOSKETCH_API_KEY, OPENAI_API_KEY | none | Required by `hosted` and `streaming` |
//! | api_base / BIOSKETCH_API_BASE | https://api.openai.com/v1 | OpenAI-compatible base URL |
//! | chat_model / BIOSKETCH_CHAT_MODEL | gpt-3.5-turbo | Chat completion model |
//! | tts_model / BIOSKETCH_TTS_MODEL | tts-1-hd | Hosted speech model |
//! | voice / BIOSKETCH_VOICE | nova | alloy, echo, fable, onyx, nova, shimmer |
//! | speech / BIOSKETCH_SPEECH | hosted | `hosted`, `local` or `silent` |
//! | render / BIOSKETCH_RENDER | both | `svg`, `scene` or `both` |

use crate::error::{SketchError, SketchResult};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default config file, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "biosketch.toml";

const ENV_PREFIX: &str = "BIOSKETCH";
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// How transcripts are turned into replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierMode {
    /// Every keyword found in the transcript fires its drawing, staggered.
    Keyword,
    /// First matching symptom wins; canned text and drawing sequence.
    #[default]
    Symptom,
    /// Hosted chat completion, one request per utterance.
    Hosted,
    /// Hosted chat completion streamed token by token.
    Streaming,
}

impl ClassifierMode {
    /// Modes that need the API key before anything else can run.
    pub fn needs_api_key(self) -> bool {
        matches!(self, ClassifierMode::Hosted | ClassifierMode::Streaming)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ClassifierMode::Keyword => "keyword",
            ClassifierMode::Symptom => "symptom",
            ClassifierMode::Hosted => "hosted",
            ClassifierMode::Streaming => "streaming",
        }
    }
}

impl std::str::FromStr for ClassifierMode {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "keyword" | "keywords" => Ok(ClassifierMode::Keyword),
            "symptom" | "symptoms" => Ok(ClassifierMode::Symptom),
            "hosted" => Ok(ClassifierMode::Hosted),
            "streaming" | "stream" => Ok(ClassifierMode::Streaming),
            other => Err(SketchError::Config(format!("unknown mode '{}'", other))),
        }
    }
}

/// Which illustration outputs are produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    Svg,
    Scene,
    #[default]
    Both,
}

impl RenderMode {
    pub fn svg(self) -> bool {
        matches!(self, RenderMode::Svg | RenderMode::Both)
    }

    pub fn scene(self) -> bool {
        matches!(self, RenderMode::Scene | RenderMode::Both)
    }
}

/// Where the spoken reply comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpeechMode {
    /// Hosted TTS, falling back to the local synthesizer on failure.
    #[default]
    Hosted,
    /// Local synthesizer only.
    Local,
    /// No audio.
    Silent,
}

fn default_api_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    300
}

fn default_stream_max_tokens() -> u32 {
    150
}

fn default_tts_model() -> String {
    "tts-1-hd".to_string()
}

fn default_voice() -> String {
    "nova".to_string()
}

fn default_speech_speed() -> f32 {
    1.0
}

fn default_locale() -> String {
    "es-ES".to_string()
}

fn default_processing_delay_ms() -> u64 {
    500
}

fn default_keyword_stagger_ms() -> u64 {
    1000
}

fn default_step_delay_ms() -> u64 {
    2000
}

fn default_word_interval_ms() -> u64 {
    150
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./sketches")
}

/// Runtime configuration of a studio session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub mode: ClassifierMode,
    /// Bearer key for the hosted endpoints. Never serialized back out.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_stream_max_tokens")]
    pub stream_max_tokens: u32,
    #[serde(default = "default_tts_model")]
    pub tts_model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_speech_speed")]
    pub speech_speed: f32,
    #[serde(default)]
    pub speech: SpeechMode,
    /// Recognition and local synthesis locale.
    #[serde(default = "default_locale")]
    pub locale: String,
    /// Pause between a final transcript and classification.
    #[serde(default = "default_processing_delay_ms")]
    pub processing_delay_ms: u64,
    /// Offset between keyword-mode drawings (index × stagger).
    #[serde(default = "default_keyword_stagger_ms")]
    pub keyword_stagger_ms: u64,
    /// Fixed delay between drawings of a symptom sequence.
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
    /// Subtitle word reveal interval.
    #[serde(default = "default_word_interval_ms")]
    pub word_interval_ms: u64,
    #[serde(default)]
    pub render: RenderMode,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Optional JSON file overriding the built-in keyword and symptom tables.
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::default(),
            api_key: None,
            api_base: default_api_base(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            stream_max_tokens: default_stream_max_tokens(),
            tts_model: default_tts_model(),
            voice: default_voice(),
            speech_speed: default_speech_speed(),
            speech: SpeechMode::default(),
            locale: default_locale(),
            processing_delay_ms: default_processing_delay_ms(),
            keyword_stagger_ms: default_keyword_stagger_ms(),
            step_delay_ms: default_step_delay_ms(),
            word_interval_ms: default_word_interval_ms(),
            render: RenderMode::default(),
            output_dir: default_output_dir(),
            catalog_path: None,
        }
    }
}

impl StudioConfig {
    /// Load from `biosketch.toml` (if present) and the environment.
    pub fn load() -> SketchResult<Self> {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from a specific TOML file (optional) layered under `BIOSKETCH_*` variables.
    pub fn load_from_path(path: &Path) -> SketchResult<Self> {
        let settings = Config::builder()
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?;
        let mut config: StudioConfig = settings.try_deserialize()?;
        if config.api_key.as_deref().map(str::trim).unwrap_or("").is_empty() {
            config.api_key = env_opt_string(ENV_OPENAI_API_KEY);
        }
        Ok(config)
    }

    /// Parse a TOML document directly (no environment layering).
    pub fn from_toml_str(content: &str) -> SketchResult<Self> {
        toml::from_str(content).map_err(|e| SketchError::Config(e.to_string()))
    }

    /// Reject configurations that cannot run. A hosted mode without a key is the only fatal case.
    pub fn validate(&self) -> SketchResult<()> {
        if self.mode.needs_api_key() && self.api_key().is_none() {
            return Err(SketchError::MissingApiKey(self.mode.as_str().to_string()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(SketchError::Config(format!(
                "temperature must be within 0.0..=2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Trimmed, non-empty API key.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }

    /// Two-letter language used for hosted transcription (`es-ES` → `es`).
    pub fn language(&self) -> &str {
        self.locale.split(['-', '_']).next().unwrap_or("es")
    }

    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn keyword_stagger(&self) -> Duration {
        Duration::from_millis(self.keyword_stagger_ms)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }

    pub fn word_interval(&self) -> Duration {
        Duration::from_millis(self.word_interval_ms)
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
