use anyhow::Context;
use common::TelemetryGuard;
use gateway::{
    config::get_configuration,
    cors::AllowedOrigins,
    logging::{SERVICE_NAME, setup_logging},
    router,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration().context("failed to load configuration")?;

    // Providers must be installed before the subscriber bridges to them
    let _telemetry = match &config.otel_endpoint {
        Some(endpoint) => Some(TelemetryGuard::init(SERVICE_NAME, endpoint, config.environment)?),
        None => None,
    };
    setup_logging(&config);

    let classifier = inference::global();

    tracing::info!("Loading model");
    let loaded = tokio::task::spawn_blocking({
        let classifier = classifier.clone();
        move || classifier.load_model()
    })
    .await?;
    match loaded {
        Ok(model) => tracing::info!(classes = model.classes.len(), "Model loaded"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load model");
            return Err(e.into());
        }
    }

    let origins = AllowedOrigins::parse(&config.allowed_origins);
    tracing::info!(origins = ?origins, "CORS configured");

    let state = AppState {
        classifier,
        top_k: config.top_k,
        max_upload_bytes: config.max_upload_bytes,
    };
    let app = router(state, &origins);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;
    tracing::info!(address = %address, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
