//! Responder behaviour end to end, with a loopback HTTP stub standing in for the hosted API.

use biosketch_core::{
    build_responder, Catalog, ChatClient, ClassifierMode, HostedResponder, ReplyFormat, Responder,
    StreamingResponder, StudioConfig, SymptomResponder, FALLBACK_REPLY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Serve exactly one HTTP response and return the base URL.
async fn serve_once(content_type: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16 * 1024];
        let mut request = Vec::new();
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            request.extend_from_slice(&buf[..n]);
            if n == 0 || request_complete(&request) {
                break;
            }
        }
        let head = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
            content_type,
            body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(body.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
    });
    format!("http://{}", addr)
}

fn request_complete(request: &[u8]) -> bool {
    let text = String::from_utf8_lossy(request);
    let Some(split) = text.find("\r\n\r\n") else {
        return false;
    };
    let length = text[..split]
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    request.len() >= split + 4 + length
}

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::builtin())
}

#[tokio::test]
async fn gases_transcript_gets_fixed_text_and_sequence() {
    let responder = SymptomResponder::new(catalog(), Duration::from_millis(2000));
    let response = responder.respond("tengo muchos gases e hinchazón").await;
    assert_eq!(response.action, "Síntoma: gases");
    assert!(response.reply.text.contains("gases"));
    assert_eq!(
        response.reply.drawings(),
        vec!["gases", "bacterias_malas", "probiotico", "bacterias_buenas", "alivio"]
    );
    assert!(!response.fallback);
}

#[tokio::test]
async fn unreachable_endpoint_falls_back() {
    let client = ChatClient::new("http://127.0.0.1:9", "test-key", "gpt-3.5-turbo").unwrap();
    let response = HostedResponder::new(client).respond("me duele el estómago").await;
    assert!(response.fallback);
    assert_eq!(response.reply.text, FALLBACK_REPLY);
    assert_eq!(response.reply.drawings(), vec!["probiotico"]);
    assert!(response.has_speech());
}

#[tokio::test]
async fn hosted_json_reply_drives_timeline() {
    let content = r#"{"text": "Tu flora se equilibra.", "events": [{"time": 0, "drawing": "probiotico"}, {"time": 2, "drawing": "intestino"}]}"#;
    let body = serde_json::json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string();
    let base = serve_once("application/json", body).await;
    let client = ChatClient::new(base, "test-key", "gpt-3.5-turbo").unwrap();

    let response = HostedResponder::new(client).respond("tengo gases").await;
    assert!(!response.fallback);
    assert_eq!(response.reply.format, ReplyFormat::Json);
    assert_eq!(response.reply.text, "Tu flora se equilibra.");
    assert_eq!(response.timeline.current_drawing(2.5), Some("intestino"));
}

#[tokio::test]
async fn hosted_prose_with_timeline_suffix() {
    let content = "Entiendo tu molestia.\nTIMELINE: 0:probiotico, 2:intestino";
    let body = serde_json::json!({"choices": [{"message": {"content": content}}]}).to_string();
    let base = serve_once("application/json", body).await;
    let client = ChatClient::new(base, "test-key", "gpt-3.5-turbo").unwrap();

    let response = HostedResponder::new(client).respond("hola").await;
    assert_eq!(response.reply.format, ReplyFormat::Timeline);
    assert_eq!(response.reply.text, "Entiendo tu molestia.");
    assert_eq!(response.timeline.events().len(), 2);
}

#[tokio::test]
async fn streaming_forwards_text_and_collects_markers() {
    let mut body = String::new();
    for token in ["Entiendo ", "tu molestia. ", "[VIZ:", "bacterias]"] {
        let chunk = serde_json::json!({"choices": [{"delta": {"content": token}}]});
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    let base = serve_once("text/event-stream", body).await;
    let client = ChatClient::new(base, "test-key", "gpt-3.5-turbo").unwrap();

    let (tx, mut rx) = mpsc::unbounded_channel();
    let response = StreamingResponder::new(client)
        .with_token_sink(tx)
        .respond("tengo gases")
        .await;

    let mut shown = String::new();
    while let Ok(text) = rx.try_recv() {
        shown.push_str(&text);
    }
    assert_eq!(shown, "Entiendo tu molestia. ");
    assert_eq!(response.reply.format, ReplyFormat::Viz);
    assert_eq!(response.reply.text, "Entiendo tu molestia.");
    assert_eq!(response.reply.drawings(), vec!["bacterias"]);
}

#[test]
fn hosted_mode_without_key_is_blocking() {
    let config = StudioConfig {
        mode: ClassifierMode::Hosted,
        api_key: None,
        ..Default::default()
    };
    assert!(config.validate().is_err());
    assert!(build_responder(&config, catalog(), None).is_err());
}
