use anyhow::{anyhow, Context};
use chati_core::{telemetry, HttpTransport, ReqwestTransport, ServerSettings};
use chati_server::{router, ProxyState};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "chati-server", version, about = "HTTP proxy routes for the Chati assistant")]
struct Cli {
    /// Address to listen on; overrides `CHATI_BIND` and chati.yaml.
    #[arg(long)]
    bind: Option<SocketAddr>,
    /// Explicit chati.yaml to load instead of the default search path.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing(telemetry::env_filter())?;
    let cli = Cli::parse();

    let settings = ServerSettings::load(cli.config.as_deref())
        .map_err(|err| anyhow!(err.user_message()))?;
    let bind = cli.bind.unwrap_or(settings.bind);
    if !settings.speech_configured() {
        warn!("ELEVENLABS_API_KEY is not set; /api/voice and /api/voices will fail");
    }

    let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::default());
    let app = router(ProxyState::from_settings(&settings, transport));

    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!(%bind, "chati proxy listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated unexpectedly")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
