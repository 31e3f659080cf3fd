//! # biosketch-voice
//!
//! Speech in and speech out for the BioSketch studio.
//!
//! ```text
//! ┌──────────────┐  ┌────────────┐  ┌──────────────┐  ┌───────────┐
//! │  Microphone  │→ │ WebRTC VAD │→ │ Turn gap     │→ │    STT    │→ TranscriptEvent
//! │    (cpal)    │  │  (30ms)    │  │ (800ms)      │  │ (hosted)  │
//! └──────────────┘  └────────────┘  └──────────────┘  └───────────┘
//!
//! reply text → Hosted TTS ──(failure)──► Local synth → Rodio sink
//! ```
//!
//! Typed lines and scripted phrases feed the same [`SpeechInput`] loop as the microphone.

pub mod audio;
pub mod error;
pub mod listen;
pub mod stt;
pub mod tts;
pub mod turn;
pub mod vad;

pub use audio::{pcm_f32_to_wav, AudioCapture, AudioChunk, AudioConfig, AudioSink, RodioSink};
pub use error::{VoiceError, VoiceResult};
pub use listen::{
    ListenHandle, MicConfig, MicSource, ScriptedSource, SpeechInput, TranscriptEvent,
    TranscriptSource, TypedSource, VoiceStatus,
};
pub use stt::{create_stt, FixedStt, HostedStt, SttBackend};
#[cfg(feature = "whisper")]
pub use stt::WhisperStt;
pub use tts::{HostedTts, LocalSynth, ResponsePlayer, SpeechOutcome, SynthVoice, TtsBackend, Voice};
pub use turn::{AudioTurn, TurnConfig, TurnDetector, TurnUpdate};
pub use vad::{VadConfig, VadDetector};
