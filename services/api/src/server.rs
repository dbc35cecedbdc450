use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemorySessionStore};
use crate::routes::with_suppression_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use suppression::config::AppConfig;
use suppression::error::AppError;
use suppression::telemetry;
use suppression::workflows::suppression::{
    HttpPaymentService, SuppressionService, VerificationPolicy,
};
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(api_url) = args.payments_api_url.take() {
        config.payments.api_url = api_url;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let sessions = Arc::new(InMemorySessionStore::new(config.session.ttl));
    let payments = Arc::new(HttpPaymentService::new(&config.payments)?);
    let suppression_service = Arc::new(SuppressionService::new(
        sessions,
        payments,
        VerificationPolicy::from(&config.payments),
        config.session.cookie_name.clone(),
    ));

    let app = with_suppression_routes(suppression_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        payments_api = %config.payments.api_url,
        "suppression service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
