use anyhow::{bail, Result};
use axum::http::StatusCode;
use chati_core::config::{ElevenLabsSettings, OpenAiSettings};
use chati_core::{
    telemetry, AppState, ElevenLabsClient, HttpBackend, MockTransport, OpenAiClient,
};
use chati_server::{router, ProxyState};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "xtask", version, about = "Automation helpers for Chati")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the proxy routes over scripted providers and send one chat turn through them.
    Smoke,
}

fn main() -> Result<()> {
    telemetry::init_tracing(EnvFilter::new("info"))?;
    let cli = Cli::parse();

    match cli.command {
        Commands::Smoke => smoke_test(),
    }
}

fn smoke_test() -> Result<()> {
    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let transport = Arc::new(MockTransport::new());
        transport.push_json(
            StatusCode::OK,
            json!({ "choices": [{ "message": { "content": "pong" } }] }),
        );
        let openai = OpenAiClient::new(
            OpenAiSettings {
                api_key: Some("sk-smoke".into()),
                ..OpenAiSettings::default()
            },
            transport.clone(),
        );
        let elevenlabs = ElevenLabsClient::new(ElevenLabsSettings::default(), transport);
        let app = router(ProxyState::new(openai, elevenlabs));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        let server = tokio::spawn(async move { axum::serve(listener, app).await });

        let state = AppState::new(Arc::new(HttpBackend::new(&format!("http://{address}"))?));
        let Some(conversation_id) = state.send_chat_message("ping from xtask").await else {
            bail!("chat message was not accepted");
        };
        server.abort();

        let store = state.snapshot();
        let messages = store
            .conversation(conversation_id)
            .map(|conversation| conversation.messages.len())
            .unwrap_or_default();
        info!("messages" = messages, "smoke test conversation recorded");
        if messages != 2 {
            bail!("expected a user message and a reply, found {messages}");
        }
        Ok(())
    })
}
