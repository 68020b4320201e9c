use anyhow::Result;
use advisorhub::{
    config::Config,
    routes::{AppState, router},
};
use advisorhub_shared::State;
use tower_http::trace::TraceLayer;

pub async fn serve(config: Config, host_override: Option<String>, port_override: Option<u16>) -> Result<()> {
    tracing::info!("Starting advisorhub server...");

    let host = host_override.unwrap_or(config.server.host.to_owned());
    let port = port_override.unwrap_or(config.server.port);

    // Every ledger commit goes through the single write connection
    let write_pool = advisorhub::create_write_pool(&config.database.url).await?;
    advisorhub_db::migrate(&write_pool).await?;

    let read_pool =
        advisorhub::create_read_pool(&config.database.url, config.database.max_connections).await?;

    let command = advisorhub_points::Command::new(
        State {
            read_db: read_pool.clone(),
            write_db: write_pool.clone(),
        },
        config.points.clone(),
    );

    tracing::info!(cron = %config.points.sweep_cron, "Starting expiry sweep scheduler...");
    let mut sched = advisorhub_points::scheduler::scheduler(&command).await?;
    sched.start().await?;

    let state = AppState {
        config,
        command,
        audit: advisorhub_audit::Query(read_pool.clone()),
        pool: read_pool.clone(),
    };

    let app = router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    let shutdown_signal = async {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(err = %err, "failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    tracing::error!(err = %err, "failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                tracing::info!("Received Ctrl+C signal");
            },
            _ = terminate => {
                tracing::info!("Received SIGTERM signal");
            },
        }

        tracing::info!("Starting graceful shutdown...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    tracing::info!("Stopping expiry sweep scheduler...");
    if let Err(err) = sched.shutdown().await {
        tracing::error!(err = %err, "failed to stop scheduler");
    }

    tracing::info!("Closing database pools...");
    read_pool.close().await;
    write_pool.close().await;

    tracing::info!("Graceful shutdown complete");

    Ok(())
}
