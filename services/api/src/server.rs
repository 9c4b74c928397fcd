use crate::cli::ServeArgs;
use crate::infra::{
    build_repository, demo_candidates, load_candidates, AppState, InMemoryDocumentStore,
    LoggingFeedbackNotifier,
};
use crate::routes::with_pipeline_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use hiring_pipeline::config::AppConfig;
use hiring_pipeline::error::AppError;
use hiring_pipeline::telemetry;
use hiring_pipeline::workflows::pipeline::PipelineOrchestrator;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let mut candidates = match args.candidates.take() {
        Some(path) => load_candidates(&path)?,
        None => Vec::new(),
    };
    if args.seed_demo {
        candidates.extend(demo_candidates());
    }
    let repository = Arc::new(build_repository(candidates)?);
    let pipeline_service = Arc::new(PipelineOrchestrator::new(
        repository,
        Arc::new(InMemoryDocumentStore::default()),
        Arc::new(LoggingFeedbackNotifier::default()),
        &config.pipeline,
    ));

    let app = with_pipeline_routes(pipeline_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        consent_min_approvals = config.pipeline.consent_min_approvals,
        "hiring pipeline service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
