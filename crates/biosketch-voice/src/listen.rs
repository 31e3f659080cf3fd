//! Speech input adapter: transcript sources plus the restart-while-listening loop.
//!
//! A [`TranscriptSource`] produces one recognition session per [`TranscriptSource::start`]
//! call; the session ends when its channel closes. [`SpeechInput::run`] starts the
//! source again for as long as listening is on, so a dropped device or an idle
//! recogniser does not end the conversation.

use crate::audio::{AudioCapture, AudioChunk, AudioConfig};
use crate::error::{VoiceError, VoiceResult};
use crate::stt::SttBackend;
use crate::turn::{AudioTurn, TurnConfig, TurnDetector, TurnUpdate};
use crate::vad::{VadConfig, VadDetector};
use chrono::Utc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

/// Pause before a finished session is restarted.
const RESTART_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Partial text; may still change.
    Interim(String),
    /// Settled utterance, ready for classification.
    Final(String),
}

/// Indicator state shown next to the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceStatus {
    Inactive,
    Listening,
    Processing,
}

impl VoiceStatus {
    pub fn label(self) -> &'static str {
        match self {
            VoiceStatus::Inactive => "Inactivo",
            VoiceStatus::Listening => "Escuchando...",
            VoiceStatus::Processing => "Procesando...",
        }
    }
}

/// Something that yields transcripts.
pub trait TranscriptSource: Send {
    /// Begin a recognition session.
    fn start(&mut self) -> VoiceResult<mpsc::UnboundedReceiver<TranscriptEvent>>;

    /// Whether a session that ended on its own should be started again.
    fn restartable(&self) -> bool {
        true
    }

    fn name(&self) -> &'static str;
}

/// Listening switch shared between the input loop and whoever controls it.
#[derive(Debug, Clone)]
pub struct ListenHandle {
    listening: Arc<watch::Sender<bool>>,
    status: Arc<watch::Sender<VoiceStatus>>,
}

impl ListenHandle {
    pub fn stop(&self) {
        self.listening.send_replace(false);
        self.status.send_replace(VoiceStatus::Inactive);
    }

    pub fn is_listening(&self) -> bool {
        *self.listening.borrow()
    }

    pub fn set_status(&self, status: VoiceStatus) {
        self.status.send_replace(status);
    }

    pub fn status(&self) -> VoiceStatus {
        *self.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<VoiceStatus> {
        self.status.subscribe()
    }
}

/// Drives a transcript source and forwards its events.
pub struct SpeechInput {
    source: Box<dyn TranscriptSource>,
    handle: ListenHandle,
    restarts: usize,
}

impl SpeechInput {
    pub fn new(source: Box<dyn TranscriptSource>) -> Self {
        let (listening, _) = watch::channel(false);
        let (status, _) = watch::channel(VoiceStatus::Inactive);
        Self {
            source,
            handle: ListenHandle {
                listening: Arc::new(listening),
                status: Arc::new(status),
            },
            restarts: 0,
        }
    }

    pub fn handle(&self) -> ListenHandle {
        self.handle.clone()
    }

    /// Sessions started again after ending on their own.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Listen until [`ListenHandle::stop`] is called, the source ends for good, or `events` closes.
    /// A source that cannot start disables voice input: the error is logged, not returned.
    pub async fn run(&mut self, events: mpsc::UnboundedSender<TranscriptEvent>) {
        self.handle.listening.send_replace(true);
        let mut listening = self.handle.listening.subscribe();
        let source = self.source.name();

        while *listening.borrow() {
            let mut rx = match self.source.start() {
                Ok(rx) => rx,
                Err(e) => {
                    error!(source, error = %e, "speech input unavailable");
                    break;
                }
            };
            self.handle.set_status(VoiceStatus::Listening);
            info!(source, "listening");

            loop {
                tokio::select! {
                    event = rx.recv() => match event {
                        Some(ev) => {
                            if events.send(ev).is_err() {
                                self.handle.stop();
                                return;
                            }
                        }
                        None => break,
                    },
                    changed = listening.changed() => {
                        if changed.is_err() || !*listening.borrow() {
                            break;
                        }
                    }
                }
            }

            if !*listening.borrow() || !self.source.restartable() {
                break;
            }
            self.restarts += 1;
            info!(source, restarts = self.restarts, "recognition ended; restarting");
            tokio::time::sleep(RESTART_DELAY).await;
        }
        self.handle.stop();
    }
}

/// Fixed phrases, each revealed word by word as interim text and then sent as final.
/// Used for suggested phrases and `--say`.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    phrases: Vec<String>,
    word_delay: Duration,
}

impl ScriptedSource {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            phrases: phrases.into_iter().map(Into::into).collect(),
            word_delay: Duration::ZERO,
        }
    }

    pub fn with_word_delay(mut self, delay: Duration) -> Self {
        self.word_delay = delay;
        self
    }
}

impl TranscriptSource for ScriptedSource {
    fn start(&mut self) -> VoiceResult<mpsc::UnboundedReceiver<TranscriptEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let phrases = self.phrases.clone();
        let delay = self.word_delay;
        tokio::spawn(async move {
            for phrase in phrases {
                let words: Vec<&str> = phrase.split_whitespace().collect();
                for n in 1..words.len() {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if tx.send(TranscriptEvent::Interim(words[..n].join(" "))).is_err() {
                        return;
                    }
                }
                if tx.send(TranscriptEvent::Final(phrase.trim().to_string())).is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }

    fn restartable(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Lines typed on stdin, each one a final transcript. Ends at EOF.
#[derive(Debug, Default)]
pub struct TypedSource;

impl TranscriptSource for TypedSource {
    fn start(&mut self) -> VoiceResult<mpsc::UnboundedReceiver<TranscriptEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if tx.send(TranscriptEvent::Final(line.to_string())).is_err() {
                            return;
                        }
                    }
                    Ok(None) => return,
                    Err(e) => {
                        warn!(error = %e, "stdin read failed");
                        return;
                    }
                }
            }
        });
        Ok(rx)
    }

    fn restartable(&self) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "typed"
    }
}

#[derive(Debug, Clone)]
pub struct MicConfig {
    pub sample_rate: u32,
    /// 30ms at 16kHz.
    pub chunk_size: usize,
    pub vad_mode: u8,
    pub turn: TurnConfig,
    /// Transcribe the open utterance this often for interim text. `None` disables it.
    pub interim_interval: Option<Duration>,
}

impl Default for MicConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_size: 480,
            vad_mode: 2,
            turn: TurnConfig::default(),
            interim_interval: None,
        }
    }
}

/// Microphone → VAD → turn gap → STT.
pub struct MicSource {
    config: MicConfig,
    stt: Arc<dyn SttBackend>,
}

impl MicSource {
    pub fn new(config: MicConfig, stt: Arc<dyn SttBackend>) -> Self {
        Self { config, stt }
    }
}

impl TranscriptSource for MicSource {
    fn start(&mut self) -> VoiceResult<mpsc::UnboundedReceiver<TranscriptEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let config = self.config.clone();
        let stt = Arc::clone(&self.stt);
        // VAD and the capture stream are !Send; both stay on this thread.
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<VoiceResult<()>>();
        thread::Builder::new()
            .name("biosketch-mic".to_string())
            .spawn(move || {
                if let Err(e) = mic_session(config, stt, tx, &ready_tx) {
                    let _ = ready_tx.send(Err(e));
                }
            })?;
        match ready_rx.recv() {
            Ok(Ok(())) => Ok(rx),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(VoiceError::AudioDevice("microphone thread exited".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "microphone"
    }
}

fn mic_session(
    config: MicConfig,
    stt: Arc<dyn SttBackend>,
    tx: mpsc::UnboundedSender<TranscriptEvent>,
    ready: &std::sync::mpsc::Sender<VoiceResult<()>>,
) -> VoiceResult<()> {
    let mut vad = VadDetector::new(VadConfig {
        sample_rate: config.sample_rate,
        mode: config.vad_mode,
    })?;
    let capture = AudioCapture::new(AudioConfig {
        sample_rate: config.sample_rate,
        channels: 1,
        buffer_size: config.chunk_size,
    })?;
    let (audio_tx, mut audio_rx) = mpsc::unbounded_channel::<AudioChunk>();
    let _stream = capture.start_capture(audio_tx)?;
    let _ = ready.send(Ok(()));

    let mut turns = TurnDetector::new(config.turn.clone());
    let mut last_interim = Instant::now();

    while let Some(chunk) = audio_rx.blocking_recv() {
        if tx.is_closed() {
            debug!("transcript receiver dropped; closing microphone");
            break;
        }
        if chunk.samples.len() != vad.chunk_size() {
            continue;
        }
        let is_speech = match vad.is_speech(&chunk.samples) {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, "vad frame skipped");
                continue;
            }
        };
        match turns.process(is_speech, &chunk.samples, chunk.timestamp) {
            Some(TurnUpdate::Started) => last_interim = chunk.timestamp,
            Some(TurnUpdate::Committed(turn)) => match stt.transcribe(&turn) {
                Ok(text) if !text.trim().is_empty() => {
                    if tx.send(TranscriptEvent::Final(text)).is_err() {
                        break;
                    }
                }
                Ok(_) => debug!("turn had no recognisable speech"),
                Err(e) => warn!(error = %e, "transcription failed"),
            },
            Some(TurnUpdate::Dropped) | None => {}
        }
        if let Some(interval) = config.interim_interval {
            if turns.in_turn() && chunk.timestamp.duration_since(last_interim) >= interval {
                last_interim = chunk.timestamp;
                let partial = AudioTurn {
                    samples: turns.pending().to_vec(),
                    timestamp: Utc::now(),
                    duration: Duration::ZERO,
                    sample_rate: config.sample_rate,
                };
                if let Ok(text) = stt.transcribe(&partial) {
                    if !text.trim().is_empty() {
                        let _ = tx.send(TranscriptEvent::Interim(text));
                    }
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits one final per session, restartable, counting starts.
    struct Flaky {
        starts: Arc<AtomicUsize>,
    }

    impl TranscriptSource for Flaky {
        fn start(&mut self) -> VoiceResult<mpsc::UnboundedReceiver<TranscriptEvent>> {
            let n = self.starts.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = mpsc::unbounded_channel();
            let _ = tx.send(TranscriptEvent::Final(format!("frase {}", n)));
            Ok(rx)
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn scripted_source_sends_interims_then_final() {
        let mut input = SpeechInput::new(Box::new(ScriptedSource::new(["tengo muchos gases"])));
        let (tx, mut rx) = mpsc::unbounded_channel();
        input.run(tx).await;

        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        assert_eq!(
            events,
            vec![
                TranscriptEvent::Interim("tengo".into()),
                TranscriptEvent::Interim("tengo muchos".into()),
                TranscriptEvent::Final("tengo muchos gases".into()),
            ]
        );
        assert_eq!(input.restarts(), 0);
        assert_eq!(input.handle().status(), VoiceStatus::Inactive);
    }

    #[tokio::test(start_paused = true)]
    async fn ended_session_restarts_while_listening() {
        let starts = Arc::new(AtomicUsize::new(0));
        let mut input = SpeechInput::new(Box::new(Flaky {
            starts: Arc::clone(&starts),
        }));
        let handle = input.handle();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let stopper = tokio::spawn(async move {
            let mut seen = Vec::new();
            while let Some(TranscriptEvent::Final(text)) = rx.recv().await {
                seen.push(text);
                if seen.len() == 3 {
                    handle.stop();
                    break;
                }
            }
            seen
        });
        input.run(tx).await;

        let seen = stopper.await.unwrap();
        assert_eq!(seen, vec!["frase 0", "frase 1", "frase 2"]);
        assert!(input.restarts() >= 2);
        assert!(!input.handle().is_listening());
    }
}
