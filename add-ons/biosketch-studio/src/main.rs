//! BioSketch studio
//!
//! Listens (microphone, typed lines or scripted phrases), answers about
//! ProBioBalance Plus and draws along with the spoken reply.

mod cli;
mod studio;

use anyhow::Context;
use biosketch_core::{build_responder, Catalog, StudioConfig};
use biosketch_voice::{
    create_stt, MicConfig, MicSource, ScriptedSource, SpeechInput, TranscriptEvent, TranscriptSource,
    TypedSource,
};
use clap::Parser;
use cli::{Cli, InputChoice, SUGGESTED_PHRASES};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use studio::{speech_player, Studio, TurnOutcome};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Word-by-word pace of scripted phrases.
const SCRIPTED_WORD_DELAY: Duration = Duration::from_millis(120);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[biosketch-studio] .env not loaded: {} (using system environment)", e);
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => StudioConfig::load_from_path(path),
        None => StudioConfig::load(),
    }
    .context("failed to load configuration")?;
    cli.apply(&mut config);

    if let Err(e) = config.validate() {
        eprintln!("❌ {}", e);
        return Err(e).context("configuration rejected");
    }

    let catalog = Arc::new(Catalog::load_or_builtin(config.catalog_path.as_deref()));
    let (token_tx, token_rx) = mpsc::unbounded_channel();
    let responder = build_responder(&config, catalog, Some(token_tx)).context("failed to build responder")?;
    tokio::spawn(echo_tokens(token_rx));

    let source = transcript_source(&cli, &config).await?;
    let speech = {
        let config = config.clone();
        tokio::task::spawn_blocking(move || speech_player(&config))
            .await
            .context("speech setup task failed")?
    };
    let mut input = SpeechInput::new(source);
    let listener = input.handle();
    let mut status = listener.subscribe_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let current = *status.borrow();
            tracing::info!(status = current.label(), "voice status");
        }
    });

    tracing::info!(
        mode = config.mode.as_str(),
        speech = ?config.speech,
        out = %config.output_dir.display(),
        "BioSketch studio started"
    );
    if config.mode.needs_api_key() {
        println!("🟢 IA Lista");
    }
    println!("💡 Prueba a decir:");
    for phrase in SUGGESTED_PHRASES {
        println!("   • {}", phrase);
    }

    let mut studio = Studio::new(config, responder, speech);
    studio.attach(listener.clone());

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let listening = tokio::spawn(async move { input.run(event_tx).await });

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(TranscriptEvent::Interim(text)) => {
                    print!("\r… {}", text);
                    let _ = std::io::stdout().flush();
                }
                Some(TranscriptEvent::Final(text)) => {
                    println!();
                    let interrupt = async {
                        let _ = tokio::signal::ctrl_c().await;
                    };
                    let turn = match studio.handle_or_interrupt(&text, interrupt).await {
                        TurnOutcome::Finished(turn) => turn,
                        TurnOutcome::Interrupted => {
                            tracing::info!("interrupted");
                            listener.stop();
                            break;
                        }
                    };
                    if let Some(turn) = turn {
                        tracing::debug!(
                            action = %turn.action,
                            chars = turn.reply.chars().count(),
                            drawn = turn.drawn,
                            speech = ?turn.speech,
                            fallback = turn.fallback,
                            "turn finished"
                        );
                        for file in &turn.files {
                            println!("🖼️  {}", file.display());
                        }
                    }
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                listener.stop();
                break;
            }
        }
    }

    listener.stop();
    let _ = listening.await;

    println!("💬 Mensajes: {}", studio.conversation().len());
    println!("📝 Últimas acciones:");
    for entry in studio.actions().entries() {
        println!("   {}", entry);
    }
    println!(
        "Elementos dibujados: {} · Última acción: {}",
        studio.illustrations().drawing_count().await,
        studio.illustrations().last_action().await
    );
    studio.shutdown().await;
    Ok(())
}

/// Print streamed reply tokens as they arrive.
async fn echo_tokens(mut tokens: mpsc::UnboundedReceiver<String>) {
    while let Some(token) = tokens.recv().await {
        print!("{}", token);
        let _ = std::io::stdout().flush();
    }
}

async fn transcript_source(cli: &Cli, config: &StudioConfig) -> anyhow::Result<Box<dyn TranscriptSource>> {
    let source: Box<dyn TranscriptSource> = match cli.input() {
        InputChoice::Phrases(phrases) => {
            Box::new(ScriptedSource::new(phrases).with_word_delay(SCRIPTED_WORD_DELAY))
        }
        InputChoice::Typed => Box::new(TypedSource),
        InputChoice::Microphone => {
            let whisper = std::env::var("BIOSKETCH_WHISPER_MODEL").ok();
            let key = config.api_key().unwrap_or_default().to_string();
            if key.is_empty() && whisper.is_none() {
                anyhow::bail!("microphone input needs OPENAI_API_KEY (or BIOSKETCH_WHISPER_MODEL with the whisper feature)");
            }
            let base = config.api_base.clone();
            let language = config.language().to_string();
            let stt = tokio::task::spawn_blocking(move || create_stt(&base, &key, &language, whisper.as_deref()))
                .await
                .context("speech recognition setup task failed")?
                .context("speech recognition unavailable")?;
            Box::new(MicSource::new(MicConfig::default(), Arc::from(stt)))
        }
    };
    Ok(source)
}
