use dotenvy::dotenv;
use tracing::{error, info};

use tutordesk::logging::{init_tracing, shutdown_tracer};
use tutordesk::metrics::{init_metrics, metrics_app};
use tutordesk::router::init_router;
use tutordesk::state::init_app_state;
use tutordesk_config::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing()?;

    if let Some(handle) = init_metrics()? {
        let metrics_port = std::env::var("METRICS_PORT").unwrap_or_else(|_| "3001".to_string());
        let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{metrics_port}")).await?;
        info!(port = %metrics_port, "Metrics exporter listening");
        tokio::spawn(async move {
            if let Err(err) = axum::serve(metrics_listener, metrics_app(handle)).await {
                error!(error = %err, "Metrics server stopped");
            }
        });
    }

    let state = init_app_state().await?;
    info!(store = state.store.backend_name(), "Application state ready");
    let app = init_router(state);

    let addr = ServerConfig::from_env().addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server running on http://{addr}");
    info!("Swagger UI available at http://{addr}/swagger-ui");
    info!("Scalar UI available at http://{addr}/scalar");

    axum::serve(listener, app).await?;

    shutdown_tracer().await;
    Ok(())
}
