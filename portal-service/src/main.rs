use portal_service::config::PortalConfig;
use portal_service::services::metrics::init_metrics;
use portal_service::startup::Application;
use service_core::error::AppError;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = PortalConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics()?;

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
        "Starting portal service"
    );

    let application = Application::build(config).await?;
    tracing::info!(port = application.port(), "Portal service ready");
    application.run_until_stopped().await?;

    tracing::info!("Service shutdown complete");
    Ok(())
}
