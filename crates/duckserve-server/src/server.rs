use crate::config::Config;
use crate::query::handle_query;
use axum::routing::{get, post};
use axum::Router;
use duckserve_core::DuckserveError;
use duckserve_engine::Database;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// State shared by every request: the database handle lives here for the
/// whole process and is closed by [`AppContext::shutdown`].
pub struct AppContext {
    pub database: Database,
}

impl AppContext {
    pub fn open(config: &Config) -> Result<Self, DuckserveError> {
        let database = Database::open(config.database.options())?;
        Ok(Self { database })
    }

    pub fn shutdown(self) -> Result<(), DuckserveError> {
        self.database.shutdown()
    }
}

pub fn router(ctx: Arc<AppContext>, query_path: &str) -> Router {
    Router::new()
        .route(query_path, post(handle_query))
        .route("/health", get(|| async { "ok" }))
        .route("/ready", get(|| async { "ok" }))
        .with_state(ctx)
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    if config.metrics.enabled {
        spawn_metrics_server(&config)?;
    }

    let ctx = Arc::new(AppContext::open(&config)?);
    let app = router(ctx.clone(), &config.server.query_path);

    let listener = TcpListener::bind(&config.server.listen_addr).await?;
    info!(
        "duckserve listening on {} (POST {})",
        config.server.listen_addr, config.server.query_path
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match Arc::try_unwrap(ctx) {
        Ok(ctx) => ctx.shutdown()?,
        Err(_) => warn!("requests still hold the database; skipping explicit close"),
    }
    info!("duckserve stopped");
    Ok(())
}

fn spawn_metrics_server(config: &Config) -> anyhow::Result<()> {
    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    let metrics_addr = config.metrics.listen_addr.clone();
    tokio::spawn(async move {
        let app = Router::new().route(
            "/metrics",
            get(move || {
                let handle = metrics_handle.clone();
                async move { handle.render() }
            }),
        );
        match TcpListener::bind(&metrics_addr).await {
            Ok(listener) => {
                info!("metrics listening on {}", metrics_addr);
                if let Err(err) = axum::serve(listener, app).await {
                    error!("metrics server error: {err}");
                }
            }
            Err(err) => error!("metrics bind error on {metrics_addr}: {err}"),
        }
    });
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!("ctrl-c handler error: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!("sigterm handler error: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
