use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use media_server::app_state::AppState;
use media_server::cache_mgr::spawn_maintenance_loop;
use media_server::config::{Args, Config};
use media_server::http;
use media_server::tracing_setup::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = Config::load(args)?;
    let listen_addr = config.listen_addr;

    let state = AppState::bootstrap(config).await?;

    let shutdown = CancellationToken::new();
    spawn_maintenance_loop(state.cache_mgr.clone(), Duration::from_secs(3600), shutdown.clone());

    let app = http::router(state);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!(%listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl_c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
    cancel.cancel();
}
