use std::sync::Arc;

use anyhow::Context;
use axum::http::HeaderValue;
use env_logger::Env;
use indexer_service::{
    config::{AppConfig, ServerConfig},
    http,
    metrics::{HealthCheckTask, MetricsUpkeepTask, setup_metrics_recorder},
    persist::PersistCtx,
    scheduler::TaskScheduler,
    service::{CatchUpTask, IndexerService},
};
use log::{info, warn};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

const HEALTH_CHECK_CRON: &str = "*/15 * * * * *";
const METRICS_UPKEEP_CRON: &str = "*/5 * * * * *";

fn load_config() -> anyhow::Result<AppConfig> {
    dotenv::dotenv()
        .map_err(|err| {
            eprintln!(".env file error: {err}");
            err
        })
        .ok();

    AppConfig::fetch()
}

fn cors_layer(server_config: &ServerConfig) -> CorsLayer {
    let origins = server_config
        .allowed_origins()
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(&origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid CORS origin {origin}: {e}");
                None
            }
        })
        .collect::<Vec<_>>();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_origin(allow_origin)
}

pub async fn bootstrap() -> anyhow::Result<()> {
    let app_config = load_config()?;
    let server_config = app_config.server_config.clone();

    env_logger::Builder::from_env(
        Env::default().default_filter_or(server_config.log_level.as_str()),
    )
    .init();

    let recorder_handle = setup_metrics_recorder()?;

    let persist_ctx = PersistCtx::new(&app_config.database_config).await?;
    let service = IndexerService::new(app_config, persist_ctx)?;
    service.spawn_indexer();

    let mut scheduler = TaskScheduler::new().await?;
    scheduler
        .add_task(Arc::new(CatchUpTask::new(service.clone())))
        .await?;
    scheduler
        .add_task(Arc::new(HealthCheckTask::new(
            service.clone(),
            HEALTH_CHECK_CRON,
        )))
        .await?;
    scheduler
        .add_task(Arc::new(MetricsUpkeepTask::new(
            recorder_handle.clone(),
            METRICS_UPKEEP_CRON,
        )))
        .await?;
    scheduler.start().await?;

    let app = http::router(service.clone(), Some(recorder_handle)).layer(cors_layer(&server_config));
    let addr = server_config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Running server on {}...", listener.local_addr()?);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server exited unexpectedly")?;

    service.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(err) = result {
                            warn!("failed waiting for Ctrl+C signal: {err}");
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                warn!("failed to register SIGTERM handler: {err}");
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("failed waiting for Ctrl+C signal: {err}");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed waiting for Ctrl+C signal: {err}");
        }
    }

    info!("shutdown signal received");
}
