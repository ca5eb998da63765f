use anyhow::Context;
use dotenvy::dotenv;
use tracing::{error, info};

use campus::campus_config::ServerConfig;
use campus::logging::{init_tracing, shutdown_tracer};
use campus::metrics::{init_metrics, metrics_app};
use campus::router::init_router;
use campus::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing()?;

    let server_config = ServerConfig::from_env();

    if server_config.observability_enabled {
        if let Some(handle) = init_metrics() {
            let metrics_address = server_config.metrics_address();
            tokio::spawn(async move {
                match tokio::net::TcpListener::bind(&metrics_address).await {
                    Ok(listener) => {
                        info!(address = %metrics_address, "Metrics server listening");
                        if let Err(e) = axum::serve(listener, metrics_app(handle)).await {
                            error!(error = %e, "Metrics server stopped");
                        }
                    }
                    Err(e) => error!(error = %e, address = %metrics_address, "Failed to bind metrics server"),
                }
            });
        }
    }

    let pool = campus::campus_db::init_db_pool().await?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let state = AppState::from_env(pool);
    let app = init_router(state);

    let address = server_config.address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    info!(address = %address, "Server running");
    info!("Swagger UI available at http://{}/swagger-ui", address);
    info!("Scalar UI available at http://{}/scalar", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    shutdown_tracer().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
    }
    info!("Shutdown signal received");
}
