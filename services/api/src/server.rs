use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryItemRepository};
use crate::routes::with_item_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use cost_ledger::config::AppConfig;
use cost_ledger::error::AppError;
use cost_ledger::items::ItemLedgerService;
use cost_ledger::telemetry;
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

    let repository = Arc::new(InMemoryItemRepository::default());
    let ledger = Arc::new(ItemLedgerService::new(repository));

    let app = with_item_routes(ledger, &config.server.allowed_origin)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        origin = %config.server.allowed_origin,
        "items cost ledger ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
