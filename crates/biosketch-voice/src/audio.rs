//! Microphone capture with CPAL and reply playback with Rodio.
//!
//! Both device handles are `!Send` on some platforms, so each lives on its own thread:
//! the capture stream inside the listener thread, the output stream inside the
//! playback thread started by [`RodioSink::new`].

use crate::error::{VoiceError, VoiceResult};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use rodio::{OutputStream, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc as std_mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Capture format.
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz (default: 16000)
    pub sample_rate: u32,
    /// Number of channels (default: 1)
    pub channels: u16,
    /// Samples per chunk (default: 480, i.e. 30ms at 16kHz)
    pub buffer_size: usize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_size: 480,
        }
    }
}

/// Fixed-size block of captured samples (f32, -1.0..1.0).
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub samples: Vec<f32>,
    pub timestamp: Instant,
}

/// Default input device opened with a fixed stream config.
pub struct AudioCapture {
    config: AudioConfig,
    device: Device,
    stream_config: StreamConfig,
}

impl AudioCapture {
    pub fn new(config: AudioConfig) -> VoiceResult<Self> {
        let device = cpal::default_host()
            .default_input_device()
            .ok_or_else(|| VoiceError::AudioDevice("No input device available".to_string()))?;
        let default_config = device.default_input_config()?;
        info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            sample_rate = config.sample_rate,
            "🎤 microphone opened (device default: {:?})",
            default_config
        );
        let stream_config = StreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size as u32),
        };
        Ok(Self {
            config,
            device,
            stream_config,
        })
    }

    /// Start the input stream; full chunks go to `chunk_tx`. Keep the returned stream alive.
    pub fn start_capture(self, chunk_tx: mpsc::UnboundedSender<AudioChunk>) -> VoiceResult<Stream> {
        let buffer_size = self.config.buffer_size;
        let mut pending = Vec::with_capacity(buffer_size);
        let stream = self.device.build_input_stream(
            &self.stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                for &sample in data {
                    pending.push(sample);
                    if pending.len() >= buffer_size {
                        let chunk = AudioChunk {
                            samples: std::mem::replace(&mut pending, Vec::with_capacity(buffer_size)),
                            timestamp: Instant::now(),
                        };
                        if chunk_tx.send(chunk).is_err() {
                            return;
                        }
                    }
                }
            },
            move |err| {
                warn!("Audio stream error: {}", err);
            },
            None,
        )?;
        stream.play()?;
        Ok(stream)
    }

    pub fn list_input_devices() -> VoiceResult<Vec<String>> {
        let devices = cpal::default_host().input_devices()?;
        Ok(devices.filter_map(|d| d.name().ok()).collect())
    }
}

/// Encode mono f32 PCM as a 16-bit WAV file, for transcription uploads.
pub fn pcm_f32_to_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let mut buf = Vec::with_capacity(44 + data_len as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    for &s in samples {
        let v = (s.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Where synthesized audio ends up.
pub trait AudioSink: Send + Sync {
    /// Decode and play `bytes` (MP3 or WAV), blocking until playback ends or is stopped.
    fn play(&self, bytes: &[u8]) -> VoiceResult<()>;

    /// Cut playback short.
    fn stop(&self);
}

/// Default output device via Rodio.
pub struct RodioSink {
    sink: Arc<Sink>,
    // Dropping this ends the thread that owns the output stream.
    _keepalive: std_mpsc::Sender<()>,
}

impl RodioSink {
    pub fn new() -> VoiceResult<Self> {
        let (ready_tx, ready_rx) = std_mpsc::channel::<VoiceResult<Arc<Sink>>>();
        let (keepalive_tx, keepalive_rx) = std_mpsc::channel::<()>();
        thread::Builder::new()
            .name("biosketch-playback".to_string())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(s) => s,
                    Err(e) => {
                        let _ = ready_tx.send(Err(VoiceError::Playback(e.to_string())));
                        return;
                    }
                };
                match Sink::try_new(&handle) {
                    Ok(sink) => {
                        let _ = ready_tx.send(Ok(Arc::new(sink)));
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(VoiceError::Playback(e.to_string())));
                        return;
                    }
                }
                // Blocks until the RodioSink is dropped.
                let _ = keepalive_rx.recv();
                drop(stream);
            })?;
        let sink = ready_rx
            .recv()
            .map_err(|_| VoiceError::Playback("playback thread exited".to_string()))??;
        info!("🔊 audio output ready");
        Ok(Self {
            sink,
            _keepalive: keepalive_tx,
        })
    }
}

impl AudioSink for RodioSink {
    fn play(&self, bytes: &[u8]) -> VoiceResult<()> {
        if bytes.is_empty() {
            return Ok(());
        }
        let source = rodio::Decoder::new(Cursor::new(bytes.to_vec()))
            .map_err(|e| VoiceError::Playback(format!("Decode failed: {}", e)))?;
        self.sink.append(source.convert_samples::<f32>());
        self.sink.sleep_until_end();
        Ok(())
    }

    fn stop(&self) {
        self.sink.stop();
    }
}
