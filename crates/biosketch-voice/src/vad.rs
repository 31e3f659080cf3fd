//! Voice activity detection with WebRTC VAD.

use crate::error::{VoiceError, VoiceResult};
use tracing::debug;
use webrtc_vad::{SampleRate, Vad, VadMode};

#[derive(Debug, Clone)]
pub struct VadConfig {
    /// 8000, 16000, 32000 or 48000 Hz.
    pub sample_rate: u32,
    /// Aggressiveness 0-3 (3 rejects the most non-speech).
    pub mode: u8,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            mode: 2,
        }
    }
}

fn vad_mode(mode: u8) -> VoiceResult<VadMode> {
    match mode {
        0 => Ok(VadMode::Quality),
        1 => Ok(VadMode::LowBitrate),
        2 => Ok(VadMode::Aggressive),
        3 => Ok(VadMode::VeryAggressive),
        other => Err(VoiceError::VadInit(format!("VAD mode must be 0-3, got {}", other))),
    }
}

fn vad_rate(rate: u32) -> VoiceResult<SampleRate> {
    match rate {
        8000 => Ok(SampleRate::Rate8kHz),
        16000 => Ok(SampleRate::Rate16kHz),
        32000 => Ok(SampleRate::Rate32kHz),
        48000 => Ok(SampleRate::Rate48kHz),
        other => Err(VoiceError::VadInit(format!(
            "WebRTC VAD only supports 8000, 16000, 32000, or 48000 Hz, got {}",
            other
        ))),
    }
}

/// Speech/silence decision per 30ms frame. `!Send`: keep it on the thread that created it.
pub struct VadDetector {
    vad: Vad,
    chunk_size: usize,
}

impl VadDetector {
    pub fn new(config: VadConfig) -> VoiceResult<Self> {
        let mode = vad_mode(config.mode)?;
        let rate = vad_rate(config.sample_rate)?;
        let mut vad = Vad::new();
        vad.set_mode(mode);
        vad.set_sample_rate(rate);
        // 30ms frames
        let chunk_size = (config.sample_rate as usize * 30) / 1000;
        Ok(Self { vad, chunk_size })
    }

    /// True when the frame holds speech. The frame must be exactly [`Self::chunk_size`] samples.
    pub fn is_speech(&mut self, frame: &[f32]) -> VoiceResult<bool> {
        if frame.len() != self.chunk_size {
            return Err(VoiceError::VadProcessing(format!(
                "Expected {} samples, got {}",
                self.chunk_size,
                frame.len()
            )));
        }
        let pcm: Vec<i16> = frame
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect();
        let speech = self
            .vad
            .is_voice_segment(&pcm)
            .map_err(|e| VoiceError::VadProcessing(format!("{:?}", e)))?;
        debug!(speech, "vad frame");
        Ok(speech)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
