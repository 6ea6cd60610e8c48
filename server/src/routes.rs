//! The four provider proxy routes plus a health probe.
//!
//! Each handler makes one outbound call and relays the result. Nothing is
//! retried, cached or rate limited.

use crate::error::{ApiError, VoicesError};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chati_core::api::{
    ChatReply, ChatRequest, HealthReply, ImageReply, ImageRequest, VoiceRequest, VoicesReply,
};
use chati_core::{ElevenLabsClient, HttpTransport, OpenAiClient, ServerSettings};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ProxyState {
    openai: OpenAiClient,
    elevenlabs: ElevenLabsClient,
}

impl ProxyState {
    pub fn new(openai: OpenAiClient, elevenlabs: ElevenLabsClient) -> Self {
        Self { openai, elevenlabs }
    }

    pub fn from_settings(settings: &ServerSettings, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(
            OpenAiClient::new(settings.openai.clone(), transport.clone()),
            ElevenLabsClient::new(settings.elevenlabs.clone(), transport),
        )
    }
}

pub fn router(state: ProxyState) -> Router {
    Router::new()
        .route("/api/chat", post(chat))
        .route("/api/image", post(image))
        .route("/api/voice", post(voice))
        .route("/api/voices", get(voices))
        .route("/api/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn chat(
    State(state): State<ProxyState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(request) = payload?;
    let content = state.openai.chat_completion(&request.messages).await?;
    Ok(Json(ChatReply { content }))
}

async fn image(
    State(state): State<ProxyState>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Result<Json<ImageReply>, ApiError> {
    let Json(request) = payload?;
    let image_url = state.openai.generate_image(&request).await?;
    Ok(Json(ImageReply { image_url }))
}

async fn voice(
    State(state): State<ProxyState>,
    payload: Result<Json<VoiceRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let voice_id = request
        .voice_id
        .as_deref()
        .unwrap_or_else(|| state.elevenlabs.default_voice_id());
    let audio = state.elevenlabs.synthesize(&request.text, voice_id).await?;
    let headers = [
        (header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg")),
        (header::CONTENT_LENGTH, HeaderValue::from(audio.len())),
    ];
    Ok((headers, audio).into_response())
}

async fn voices(State(state): State<ProxyState>) -> Result<Json<VoicesReply>, VoicesError> {
    let voices = state.elevenlabs.voices().await?;
    Ok(Json(VoicesReply { voices }))
}

async fn health(State(state): State<ProxyState>) -> Json<HealthReply> {
    Json(HealthReply {
        status: "ok".to_string(),
        speech_configured: state.elevenlabs.is_configured(),
    })
}
