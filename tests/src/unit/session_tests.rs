use axum::http::StatusCode;
use chati_core::config::{ElevenLabsSettings, OpenAiSettings};
use chati_core::session::{CHAT_APOLOGY, VOICE_APOLOGY};
use chati_core::{
    AppState, ElevenLabsClient, HttpBackend, ImageQuality, ImageSize, MessageKind, MessageRole,
    MockTransport, OpenAiClient, ViewKind,
};
use chati_server::{router, ProxyState};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

async fn serve(transport: Arc<MockTransport>, speech_key: Option<&str>) -> anyhow::Result<String> {
    let openai = OpenAiClient::new(
        OpenAiSettings {
            api_key: Some("sk-test".into()),
            ..OpenAiSettings::default()
        },
        transport.clone(),
    );
    let elevenlabs = ElevenLabsClient::new(
        ElevenLabsSettings {
            api_key: speech_key.map(str::to_string),
            ..ElevenLabsSettings::default()
        },
        transport,
    );
    let app = router(ProxyState::new(openai, elevenlabs));
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{address}"))
}

async fn session(transport: Arc<MockTransport>, speech_key: Option<&str>) -> AppState {
    let base = serve(transport, speech_key).await.expect("server");
    let backend = HttpBackend::new(&base).expect("backend");
    AppState::new(Arc::new(backend))
}

#[tokio::test]
async fn chat_round_trip_through_proxy() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "content": "¡Hola!" } }] }),
    );
    transport.push_json(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "content": "Claro." } }] }),
    );
    let state = session(transport.clone(), None).await;

    let id = state.send_chat_message("hola").await.expect("accepted");
    let again = state.send_chat_message("¿me ayudas?").await.expect("accepted");
    assert_eq!(id, again);

    let store = state.snapshot();
    let conversation = store.conversation(id).unwrap();
    let contents: Vec<_> = conversation
        .messages
        .iter()
        .map(|m| (m.role, m.content.as_str()))
        .collect();
    assert_eq!(
        contents,
        vec![
            (MessageRole::User, "hola"),
            (MessageRole::Assistant, "¡Hola!"),
            (MessageRole::User, "¿me ayudas?"),
            (MessageRole::Assistant, "Claro."),
        ]
    );
    assert_eq!(conversation.title, "hola");

    // the second call carries the whole history
    let second = transport.requests()[1].json.clone().unwrap();
    assert_eq!(second["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn provider_failure_becomes_apology() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        StatusCode::UNAUTHORIZED,
        json!({ "error": { "message": "Incorrect API key provided" } }),
    );
    let state = session(transport, None).await;

    let id = state.send_chat_message("hola").await.unwrap();
    let store = state.snapshot();
    let last = store.conversation(id).unwrap().messages.last().unwrap().clone();
    assert_eq!(last.content, CHAT_APOLOGY);
    assert!(!store.is_loading());
}

#[tokio::test]
async fn image_generation_through_proxy() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        StatusCode::OK,
        json!({ "data": [{ "url": "https://images.test/cat.png" }] }),
    );
    let state = session(transport.clone(), None).await;

    let id = state
        .generate_image("a cat", ImageSize::Portrait, ImageQuality::Standard)
        .await
        .unwrap();

    let store = state.snapshot();
    assert_eq!(store.current_view(), ViewKind::Image);
    let reply = store.conversation(id).unwrap().messages[1].clone();
    assert_eq!(reply.kind, MessageKind::Image);
    assert_eq!(reply.image_url.as_deref(), Some("https://images.test/cat.png"));
    assert_eq!(transport.last_request().unwrap().json.unwrap()["size"], "1024x1792");
}

#[tokio::test]
async fn voice_synthesis_through_proxy() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        StatusCode::OK,
        json!({ "voices": [{ "voice_id": "EXAVITQu4vr4xnSDxMaL", "name": "Sarah" }] }),
    );
    transport.push_bytes(StatusCode::OK, b"ID3".to_vec());
    let state = session(transport, Some("xi-key")).await;

    assert!(state.refresh_voices().await);
    let id = state.synthesize_voice("buenas noches").await.unwrap();

    let reply = state.snapshot().conversation(id).unwrap().messages[1].clone();
    assert_eq!(reply.kind, MessageKind::Audio);
    assert_eq!(reply.content, "Audio generado con Sarah");
    assert_eq!(reply.audio_url.as_deref(), Some("data:audio/mpeg;base64,SUQz"));
}

#[tokio::test]
async fn voice_without_speech_credential_apologises() {
    let transport = Arc::new(MockTransport::new());
    let state = session(transport.clone(), None).await;

    assert!(!state.refresh_voices().await);
    let id = state.synthesize_voice("hola").await.unwrap();

    let reply = state.snapshot().conversation(id).unwrap().messages[1].clone();
    assert_eq!(reply.content, VOICE_APOLOGY);
    assert_eq!(reply.kind, MessageKind::Text);
    assert!(transport.requests().is_empty());
}
