//! Command-line surface. Flags override whatever the config file and environment set.

use biosketch_core::{ClassifierMode, RenderMode, SpeechMode, StudioConfig};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Phrases offered to the user (and played by `--demo`).
pub const SUGGESTED_PHRASES: [&str; 4] = [
    "¿Qué son los lactobacilos?",
    "Explícame el intestino humano",
    "Beneficios de los probióticos",
    "Proceso de fermentación",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Keyword,
    Symptom,
    Hosted,
    Streaming,
}

impl From<ModeArg> for ClassifierMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Keyword => ClassifierMode::Keyword,
            ModeArg::Symptom => ClassifierMode::Symptom,
            ModeArg::Hosted => ClassifierMode::Hosted,
            ModeArg::Streaming => ClassifierMode::Streaming,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderArg {
    Svg,
    Scene,
    Both,
}

impl From<RenderArg> for RenderMode {
    fn from(render: RenderArg) -> Self {
        match render {
            RenderArg::Svg => RenderMode::Svg,
            RenderArg::Scene => RenderMode::Scene,
            RenderArg::Both => RenderMode::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpeechArg {
    Hosted,
    Local,
    Silent,
}

impl From<SpeechArg> for SpeechMode {
    fn from(speech: SpeechArg) -> Self {
        match speech {
            SpeechArg::Hosted => SpeechMode::Hosted,
            SpeechArg::Local => SpeechMode::Local,
            SpeechArg::Silent => SpeechMode::Silent,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "biosketch-studio", version, about = "Voice-driven probiotic assistant that draws while it talks")]
pub struct Cli {
    /// How transcripts are answered.
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// TOML config file (default: ./biosketch.toml when present).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Say this phrase instead of listening. Repeat for several turns.
    #[arg(long, value_name = "TEXT")]
    pub say: Vec<String>,

    /// Play the suggested phrases as if spoken.
    #[arg(long, conflicts_with_all = ["say", "mic"])]
    pub demo: bool,

    /// Read transcripts from stdin, one per line (the default input).
    #[arg(long, conflicts_with = "mic")]
    pub typed: bool,

    /// Listen on the default microphone.
    #[arg(long)]
    pub mic: bool,

    /// Which illustration files to write.
    #[arg(long, value_enum)]
    pub render: Option<RenderArg>,

    /// Where illustrations are written.
    #[arg(long, value_name = "DIR")]
    pub out: Option<PathBuf>,

    /// How replies are spoken.
    #[arg(long, value_enum)]
    pub speech: Option<SpeechArg>,

    /// Hosted TTS voice (alloy, echo, fable, onyx, nova, shimmer).
    #[arg(long)]
    pub voice: Option<String>,
}

/// Where transcripts come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputChoice {
    Phrases(Vec<String>),
    Typed,
    Microphone,
}

impl Cli {
    pub fn apply(&self, config: &mut StudioConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(render) = self.render {
            config.render = render.into();
        }
        if let Some(out) = &self.out {
            config.output_dir = out.clone();
        }
        if let Some(speech) = self.speech {
            config.speech = speech.into();
        }
        if let Some(voice) = &self.voice {
            config.voice = voice.clone();
        }
    }

    pub fn input(&self) -> InputChoice {
        if self.demo {
            InputChoice::Phrases(SUGGESTED_PHRASES.iter().map(|p| p.to_string()).collect())
        } else if !self.say.is_empty() {
            InputChoice::Phrases(self.say.clone())
        } else if self.mic {
            InputChoice::Microphone
        } else {
            InputChoice::Typed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = Cli::parse_from([
            "biosketch-studio",
            "--mode",
            "symptom",
            "--render",
            "svg",
            "--out",
            "/tmp/sk",
            "--speech",
            "silent",
            "--voice",
            "shimmer",
        ]);
        let mut config = StudioConfig::default();
        cli.apply(&mut config);
        assert_eq!(config.mode, ClassifierMode::Symptom);
        assert_eq!(config.render, RenderMode::Svg);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/sk"));
        assert_eq!(config.speech, SpeechMode::Silent);
        assert_eq!(config.voice, "shimmer");
    }

    #[test]
    fn no_flags_leave_config_alone() {
        let cli = Cli::parse_from(["biosketch-studio"]);
        let mut config = StudioConfig::default();
        let before = config.mode;
        cli.apply(&mut config);
        assert_eq!(config.mode, before);
        assert_eq!(cli.input(), InputChoice::Typed);
    }

    #[test]
    fn say_repeats_and_demo_uses_suggestions() {
        let cli = Cli::parse_from(["biosketch-studio", "--say", "tengo gases", "--say", "gracias"]);
        assert_eq!(
            cli.input(),
            InputChoice::Phrases(vec!["tengo gases".to_string(), "gracias".to_string()])
        );
        let demo = Cli::parse_from(["biosketch-studio", "--demo"]);
        match demo.input() {
            InputChoice::Phrases(p) => assert_eq!(p[0], "¿Qué son los lactobacilos?"),
            other => panic!("unexpected input {:?}", other),
        }
    }

    #[test]
    fn mic_and_typed_conflict() {
        assert!(Cli::try_parse_from(["biosketch-studio", "--mic", "--typed"]).is_err());
    }
}
