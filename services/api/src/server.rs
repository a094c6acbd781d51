use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use closing_docs::config::AppConfig;
use closing_docs::error::AppError;
use closing_docs::merge::{spawn_event_logger, MergeEventBus, MergeOrchestrator, MergeQueue};
use closing_docs::package::{ClosingPackageService, JsonDocumentAdapter};
use closing_docs::telemetry;
use closing_docs::template::TemplateProcessor;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryTemplateSource};
use crate::routes::with_closing_routes;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(max_concurrency) = args.max_concurrency.take() {
        config.merge.max_concurrency = max_concurrency.max(1);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
        processor: TemplateProcessor::new(config.merge.root_name.clone())
            .with_max_extra_passes(config.merge.max_extra_passes),
    };

    let queue = MergeQueue::new();
    let events = Arc::new(MergeEventBus::default());
    let event_logger = spawn_event_logger(&events);
    let orchestrator = Arc::new(MergeOrchestrator::new(
        queue.clone(),
        Arc::clone(&events),
        &config.merge,
    ));
    drop(events);

    let cancel = CancellationToken::new();
    let merge_loop = {
        let orchestrator = Arc::clone(&orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run(cancel).await })
    };
    drop(orchestrator);

    let templates = Arc::new(InMemoryTemplateSource::with_samples()?);
    let package_service = Arc::new(ClosingPackageService::new(
        templates,
        Arc::new(JsonDocumentAdapter),
        queue,
    ));

    let app = with_closing_routes(package_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "closing document service ready");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    readiness_flag.store(false, Ordering::Release);
    cancel.cancel();
    if let Err(err) = merge_loop.await {
        error!(error = %err, "merge orchestrator task failed");
    }
    if let Err(err) = event_logger.await {
        warn!(error = %err, "merge event logger task failed");
    }

    info!("closing document service stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested; draining merge queue"),
        Err(err) => error!(error = %err, "failed to listen for shutdown signal"),
    }
}
