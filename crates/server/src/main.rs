//! Process entry point (§6): load settings, load the startup model, bind
//! the scheduler's dedicated consumer thread, serve HTTP, shut down
//! gracefully on SIGINT/SIGTERM.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use stt_gateway_config::GatewaySettings;
use stt_gateway_server::scheduler::Scheduler;
use stt_gateway_server::state::AppState;
use stt_gateway_server::build_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = GatewaySettings::load().context("failed to load gateway settings")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&settings.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let initial_spec = stt_gateway_registry::resolve(&settings.model_id)
        .context("startup MODEL_ID is not a known registry alias or engine-qualified model id")?;

    tracing::info!(
        model_id = %initial_spec.model_id,
        engine_kind = ?initial_spec.engine_kind,
        port = settings.port,
        max_queue_size = settings.max_queue_size,
        "starting stt-gateway"
    );

    let factory = Scheduler::production_factory(
        settings.funasr_sidecar_url.clone(),
        settings.mlx_binary_path.clone(),
    );
    let scheduler = Scheduler::start(initial_spec, factory, settings.max_queue_size)
        .context("failed to start the scheduler")?;

    let state = AppState {
        scheduler: scheduler.clone(),
        max_upload_bytes: settings.max_upload_bytes(),
    };

    let app = build_router(state, &settings.allowed_origins);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", settings.port))
        .await
        .with_context(|| format!("failed to bind port {}", settings.port))?;

    tracing::info!(port = settings.port, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    scheduler.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
