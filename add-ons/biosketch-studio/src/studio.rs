//! Session controller: one transcript in, one spoken and illustrated reply out.

use biosketch_canvas::{IllustrationPlayer, Outputs};
use biosketch_core::{
    ActionLog, ClassifierMode, Conversation, Responder, Response, SpeechMode, StudioConfig, Subtitles,
};
use biosketch_voice::{
    HostedTts, ListenHandle, LocalSynth, ResponsePlayer, RodioSink, SpeechOutcome, SynthVoice, Voice,
    VoiceStatus,
};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// What one turn produced.
#[derive(Debug, Clone)]
pub struct TurnSummary {
    pub action: String,
    pub reply: String,
    pub fallback: bool,
    pub drawn: usize,
    pub speech: SpeechOutcome,
    pub files: Vec<PathBuf>,
}

/// How a turn raced against an interrupt ended.
#[derive(Debug)]
pub enum TurnOutcome {
    Finished(Option<TurnSummary>),
    Interrupted,
}

/// Build the reply voice for `config`. Constructs blocking HTTP clients, so call it
/// from a blocking thread.
pub fn speech_player(config: &StudioConfig) -> ResponsePlayer {
    if config.speech == SpeechMode::Silent {
        return ResponsePlayer::silent();
    }
    let sink = match RodioSink::new() {
        Ok(sink) => sink,
        Err(e) => {
            warn!(error = %e, "no audio output; replies will not be spoken");
            return ResponsePlayer::silent();
        }
    };
    let local = LocalSynth::new(SynthVoice {
        language: config.language().to_string(),
        ..SynthVoice::default()
    });
    let key = match (config.speech, config.api_key()) {
        (SpeechMode::Hosted, Some(key)) => key,
        _ => return ResponsePlayer::local(local, Box::new(sink)),
    };
    let voice = config.voice.parse::<Voice>().unwrap_or_else(|e| {
        warn!(error = %e, "unknown voice; using the default");
        Voice::default()
    });
    match HostedTts::new(&config.api_base, key) {
        Ok(tts) => {
            let tts = tts
                .with_model(&config.tts_model)
                .with_voice(voice)
                .with_speed(config.speech_speed);
            ResponsePlayer::hosted(tts, local, Box::new(sink))
        }
        Err(e) => {
            warn!(error = %e, "hosted TTS unavailable; using the local synthesizer");
            ResponsePlayer::local(local, Box::new(sink))
        }
    }
}

/// Owns everything a conversation touches: the responder, both players and the history.
pub struct Studio {
    config: StudioConfig,
    responder: Box<dyn Responder>,
    speech: Arc<ResponsePlayer>,
    illustrations: IllustrationPlayer,
    drawn_actions: mpsc::UnboundedReceiver<String>,
    conversation: Conversation,
    actions: ActionLog,
    listener: Option<ListenHandle>,
    turns: usize,
}

impl Studio {
    pub fn new(config: StudioConfig, responder: Box<dyn Responder>, speech: ResponsePlayer) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            config,
            responder,
            speech: Arc::new(speech),
            illustrations: IllustrationPlayer::new().with_actions(tx),
            drawn_actions: rx,
            conversation: Conversation::new(),
            actions: ActionLog::new(),
            listener: None,
            turns: 0,
        }
    }

    /// Status updates ("Escuchando...", "Procesando...") go to this listener.
    pub fn attach(&mut self, listener: ListenHandle) {
        self.listener = Some(listener);
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn actions(&self) -> &ActionLog {
        &self.actions
    }

    pub fn illustrations(&self) -> &IllustrationPlayer {
        &self.illustrations
    }

    fn set_status(&self, status: VoiceStatus) {
        if let Some(listener) = &self.listener {
            listener.set_status(status);
        }
        debug!(status = status.label(), "voice status");
    }

    /// Run one full response cycle for a final transcript. Empty transcripts are ignored.
    pub async fn handle_transcript(&mut self, transcript: &str) -> Option<TurnSummary> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return None;
        }
        self.turns += 1;
        self.set_status(VoiceStatus::Processing);
        self.conversation.push_user(transcript);
        println!("🗣️  Tú: {}", transcript);

        tokio::time::sleep(self.config.processing_delay()).await;
        let response = self.responder.respond(transcript).await;
        info!(
            mode = self.responder.mode().as_str(),
            action = %response.action,
            fallback = response.fallback,
            cues = response.timeline.events().len(),
            "response ready"
        );
        self.actions.record(&response.action);

        if response.has_speech() {
            self.conversation.push_assistant(&response.reply.text);
            println!("🤖 Elsa: {}", response.reply.text);
        } else {
            println!("🎨 {}", response.action);
        }

        // Keyword mode keeps adding to the same picture.
        if self.config.mode != ClassifierMode::Keyword {
            self.illustrations.clear().await;
        }

        let (drawn, speech) = self.perform(&response).await;
        while let Ok(action) = self.drawn_actions.try_recv() {
            self.actions.record(&action);
        }

        let files = self.save_outputs(response.timeline.duration()).await;
        self.set_status(VoiceStatus::Listening);

        Some(TurnSummary {
            action: response.action,
            reply: response.reply.text,
            fallback: response.fallback,
            drawn,
            speech,
            files,
        })
    }

    /// [`Self::handle_transcript`], abandoned as soon as `interrupt` completes.
    pub async fn handle_or_interrupt<F>(&mut self, transcript: &str, interrupt: F) -> TurnOutcome
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            turn = self.handle_transcript(transcript) => TurnOutcome::Finished(turn),
            _ = interrupt => {
                let speaking = self.speech.is_speaking();
                if speaking {
                    self.speech.stop();
                }
                info!(turn = self.turns, speaking, "turn interrupted");
                TurnOutcome::Interrupted
            }
        }
    }

    /// Speak, reveal subtitles and play the drawing timeline side by side.
    async fn perform(&self, response: &Response) -> (usize, SpeechOutcome) {
        let text = response.reply.text.clone();
        let speak = async {
            if !response.has_speech() {
                return SpeechOutcome::Skipped;
            }
            let player = Arc::clone(&self.speech);
            let text = text.clone();
            tokio::task::spawn_blocking(move || player.speak(&text))
                .await
                .unwrap_or_else(|e| {
                    warn!(error = %e, "speech task failed");
                    SpeechOutcome::Skipped
                })
        };
        let subtitles = async {
            if !response.has_speech() {
                return;
            }
            Subtitles::new(&text, self.config.word_interval())
                .play(|shown, progress| debug!(progress = progress.round() as u32, "{}", shown))
                .await;
        };
        let drawing = self.illustrations.play_timeline(&response.timeline);

        let (speech, (), drawn) = tokio::join!(speak, subtitles, drawing);
        debug!(?speech, drawn, "turn performed");
        (drawn, speech)
    }

    async fn save_outputs(&self, duration: f64) -> Vec<PathBuf> {
        let outputs = Outputs {
            svg: self.config.render.svg(),
            scene: self.config.render.scene(),
        };
        let stem = format!("turn-{:03}", self.turns);
        match self
            .illustrations
            .save(&self.config.output_dir, &stem, outputs, duration)
            .await
        {
            Ok(files) => files,
            Err(e) => {
                warn!(error = %e, dir = %self.config.output_dir.display(), "could not write illustrations");
                Vec::new()
            }
        }
    }

    /// Stop listening and release the audio clients off the async runtime.
    pub async fn shutdown(self) {
        if let Some(listener) = &self.listener {
            listener.stop();
        }
        let speech = self.speech;
        speech.stop();
        let _ = tokio::task::spawn_blocking(move || drop(speech)).await;
        info!(turns = self.turns, "studio closed");
    }
}
