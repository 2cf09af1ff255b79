use std::sync::Arc;

use health_intake::channels::{Channel, CliChannel, TelegramChannel};
use health_intake::config::IntakeConfig;
use health_intake::intake::{
    CompletionSink, Dispatcher, FormController, IntakeRouteState, LogSink, ProfileArchive,
    SessionStore, WebhookSink, intake_routes, spawn_eviction_task,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = IntakeConfig::from_env()?;

    eprintln!("🩺 Health Intake v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Default language: {}", config.default_language.tag());
    eprintln!("   Status API: http://0.0.0.0:{}/api/intake/status", config.http_port);

    // ── Completion sink ─────────────────────────────────────────────────
    let sink: Arc<dyn CompletionSink> = match &config.sink_url {
        Some(url) => {
            eprintln!("   Sink: webhook ({url})");
            Arc::new(WebhookSink::new(url.clone(), config.sink_secret.clone()))
        }
        None => {
            eprintln!("   Sink: log only");
            Arc::new(LogSink)
        }
    };

    // ── Sessions ────────────────────────────────────────────────────────
    let sessions = SessionStore::new(config.session_ttl);
    let archive = ProfileArchive::new();
    let _eviction_handle = spawn_eviction_task(Arc::clone(&sessions), config.sweep_interval);

    let controller = Arc::new(FormController::new(
        Arc::clone(&sessions),
        Arc::clone(&archive),
        Some(sink),
        config.default_language,
    ));

    // ── HTTP API ────────────────────────────────────────────────────────
    let app = intake_routes(IntakeRouteState {
        sessions: Arc::clone(&sessions),
        archive: Arc::clone(&archive),
    });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.http_port)).await?;
    let http_port = config.http_port;
    tokio::spawn(async move {
        tracing::info!(port = http_port, "Intake HTTP API started");
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Intake HTTP API stopped: {e}");
        }
    });

    // ── Channel ─────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.telegram_bot_token.clone() {
        Some(token) => {
            let allowed = &config.allowed_users;
            eprintln!(
                "   Channel: telegram (allowed: {})",
                if allowed.iter().any(|u| u == "*") {
                    "everyone".to_string()
                } else {
                    allowed.join(", ")
                }
            );
            let telegram = TelegramChannel::new(token, config.allowed_users.clone());
            if let Err(e) = telegram.health_check().await {
                tracing::warn!("Telegram health check failed: {e}");
            }
            Arc::new(telegram)
        }
        None => {
            eprintln!("   Channel: cli (send /intake to begin, Ctrl+C to exit)\n");
            Arc::new(CliChannel::new())
        }
    };

    let dispatcher = Dispatcher::new(controller, channel, config.lane_idle);
    dispatcher.run().await?;

    Ok(())
}
