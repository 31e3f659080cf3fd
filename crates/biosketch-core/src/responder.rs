//! Turn a final transcript into a reply and a drawing timeline.
//!
//! One [`Responder`] per classifier mode. Responders never fail: a hosted call that
//! errors out is logged and replaced by [`FALLBACK_REPLY`] with the default drawing.

use crate::catalog::Catalog;
use crate::chat::ChatClient;
use crate::classifier::{KeywordClassifier, SymptomClassifier};
use crate::config::{ClassifierMode, StudioConfig};
use crate::error::{SketchError, SketchResult};
use crate::prompts;
use crate::reply::{parse_reply, AssistantReply, ReplyFormat};
use crate::stream::MarkerFilter;
use crate::timeline::Timeline;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Spoken when the hosted model cannot be reached or returns nothing usable.
pub const FALLBACK_REPLY: &str = "Disculpa, hubo un problema al procesar tu consulta. \
ProBioBalance Plus es un excelente probiótico que puede ayudarte con diversos problemas \
digestivos. ¿Podrías decirme más específicamente qué molestias tienes?";

/// Action logged when keyword mode finds nothing.
pub const NO_KEYWORDS_ACTION: &str = "No se detectaron keywords de probióticos";

/// Outcome of one response cycle.
#[derive(Debug, Clone)]
pub struct Response {
    /// Text to show and speak. Empty in keyword mode.
    pub reply: AssistantReply,
    /// Drawing schedule for the illustration player.
    pub timeline: Timeline,
    /// Short description for the action log.
    pub action: String,
    /// True when the reply is the canned fallback after a hosted failure.
    pub fallback: bool,
}

impl Response {
    fn fallback(err: &SketchError) -> Self {
        warn!(target: "biosketch::chat", error = %err, "hosted reply failed; using fallback text");
        let reply = AssistantReply::plain(FALLBACK_REPLY);
        let timeline = reply.timeline();
        Self {
            reply,
            timeline,
            action: "Respuesta de respaldo".to_string(),
            fallback: true,
        }
    }

    fn hosted(reply: AssistantReply) -> Self {
        let timeline = reply.timeline();
        let action = format!("Respuesta IA: {}", reply.drawings().join(", "));
        Self {
            reply,
            timeline,
            action,
            fallback: false,
        }
    }

    /// True when there is something to speak.
    pub fn has_speech(&self) -> bool {
        !self.reply.text.trim().is_empty()
    }
}

#[async_trait]
pub trait Responder: Send + Sync {
    fn mode(&self) -> ClassifierMode;

    async fn respond(&self, transcript: &str) -> Response;
}

fn secs(d: Duration) -> f64 {
    d.as_secs_f64()
}

/// Every keyword match fires its drawing, `stagger` apart. Nothing is spoken.
pub struct KeywordResponder {
    catalog: Arc<Catalog>,
    stagger: Duration,
}

impl KeywordResponder {
    pub fn new(catalog: Arc<Catalog>, stagger: Duration) -> Self {
        Self { catalog, stagger }
    }
}

#[async_trait]
impl Responder for KeywordResponder {
    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Keyword
    }

    async fn respond(&self, transcript: &str) -> Response {
        let matched = KeywordClassifier::new(&self.catalog).detect(transcript);
        let action = if matched.is_empty() {
            NO_KEYWORDS_ACTION.to_string()
        } else {
            format!("Detectado: {}", matched.join(", "))
        };
        info!(matches = matched.len(), "{}", action);
        let reply = AssistantReply::canned(String::new(), &matched, secs(self.stagger));
        let timeline = Timeline::stepped(matched, secs(self.stagger));
        Response {
            reply,
            timeline,
            action,
            fallback: false,
        }
    }
}

/// First matching symptom: canned explanation plus its drawing sequence, `step` apart.
pub struct SymptomResponder {
    catalog: Arc<Catalog>,
    step: Duration,
}

impl SymptomResponder {
    pub fn new(catalog: Arc<Catalog>, step: Duration) -> Self {
        Self { catalog, step }
    }
}

#[async_trait]
impl Responder for SymptomResponder {
    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Symptom
    }

    async fn respond(&self, transcript: &str) -> Response {
        let entry = SymptomClassifier::new(&self.catalog).classify(transcript);
        info!(category = %entry.category, "symptom classified");
        let reply = AssistantReply::canned(entry.response.clone(), &entry.drawings, secs(self.step));
        let timeline = Timeline::stepped(entry.drawings.iter().cloned(), secs(self.step));
        Response {
            reply,
            timeline,
            action: format!("Síntoma: {}", entry.category),
            fallback: false,
        }
    }
}

/// One chat completion per utterance, asked for the JSON reply shape.
pub struct HostedResponder {
    client: ChatClient,
    system_prompt: String,
}

impl HostedResponder {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            system_prompt: prompts::json_system_prompt(),
        }
    }

    async fn try_respond(&self, transcript: &str) -> SketchResult<AssistantReply> {
        let raw = self.client.complete(&self.system_prompt, transcript, true).await?;
        let reply = parse_reply(&raw);
        if reply.text.trim().is_empty() {
            return Err(SketchError::Chat("reply has no text".to_string()));
        }
        if reply.format == ReplyFormat::Plain {
            info!(target: "biosketch::chat", "reply carried no drawing cues; using default drawing");
        }
        Ok(reply)
    }
}

#[async_trait]
impl Responder for HostedResponder {
    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Hosted
    }

    async fn respond(&self, transcript: &str) -> Response {
        match self.try_respond(transcript).await {
            Ok(reply) => Response::hosted(reply),
            Err(e) => Response::fallback(&e),
        }
    }
}

/// Streamed completion. Marker-free text is forwarded to the token sink as it arrives;
/// `[VIZ:key]` markers in the finished text become the drawing cues.
pub struct StreamingResponder {
    client: ChatClient,
    system_prompt: String,
    tokens: Option<mpsc::UnboundedSender<String>>,
}

impl StreamingResponder {
    pub fn new(client: ChatClient) -> Self {
        Self {
            client,
            system_prompt: prompts::streaming_system_prompt(),
            tokens: None,
        }
    }

    /// Receive visible text fragments while the reply streams in.
    pub fn with_token_sink(mut self, tokens: mpsc::UnboundedSender<String>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    fn forward(&self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(tx) = &self.tokens {
            let _ = tx.send(text);
        }
    }

    async fn try_respond(&self, transcript: &str) -> SketchResult<AssistantReply> {
        let mut rx = self.client.stream(&self.system_prompt, transcript).await?;
        let mut full = String::new();
        let mut filter = MarkerFilter::new();
        while let Some(token) = rx.recv().await {
            full.push_str(&token);
            self.forward(filter.push(&token));
        }
        self.forward(filter.finish());
        if full.trim().is_empty() {
            return Err(SketchError::Stream("stream ended without content".to_string()));
        }
        Ok(parse_reply(&full))
    }
}

#[async_trait]
impl Responder for StreamingResponder {
    fn mode(&self) -> ClassifierMode {
        ClassifierMode::Streaming
    }

    async fn respond(&self, transcript: &str) -> Response {
        match self.try_respond(transcript).await {
            Ok(reply) => Response::hosted(reply),
            Err(e) => Response::fallback(&e),
        }
    }
}

/// Build the responder for the configured mode. Fails only when a hosted mode has no key.
pub fn build_responder(
    config: &StudioConfig,
    catalog: Arc<Catalog>,
    tokens: Option<mpsc::UnboundedSender<String>>,
) -> SketchResult<Box<dyn Responder>> {
    let responder: Box<dyn Responder> = match config.mode {
        ClassifierMode::Keyword => Box::new(KeywordResponder::new(catalog, config.keyword_stagger())),
        ClassifierMode::Symptom => Box::new(SymptomResponder::new(catalog, config.step_delay())),
        ClassifierMode::Hosted => Box::new(HostedResponder::new(ChatClient::from_config(config)?)),
        ClassifierMode::Streaming => {
            let client = ChatClient::from_config(config)?.with_max_tokens(config.stream_max_tokens);
            let mut responder = StreamingResponder::new(client);
            if let Some(tx) = tokens {
                responder = responder.with_token_sink(tx);
            }
            Box::new(responder)
        }
    };
    Ok(responder)
}
