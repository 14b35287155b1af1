//! API server binary
//!
//! Boots the billing engine against PostgreSQL: loads configuration from
//! `API_*` environment variables (`.env` honored in development), applies
//! migrations, wires every domain service onto its adapter, and serves the
//! router until SIGTERM/Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_billing::ports::LoggingNotificationSink;
use domain_billing::{BillingPeriodService, PaymentService};
use domain_invoicing::{InvoiceService, MockInvoiceProvider};
use domain_reconciliation::ReconciliationService;
use infra_db::{
    create_pool_from_url, run_migrations, PostgresBillingAdapter, PostgresInvoicingAdapter,
    PostgresPatientAdapter, PostgresReconciliationAdapter, PostgresSessionSource,
};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = ApiConfig::from_env().unwrap_or_else(|err| {
        eprintln!("config error ({err}), continuing with defaults");
        ApiConfig::default()
    });
    // Plain DATABASE_URL wins when set, matching sqlx tooling conventions
    if let Ok(url) = std::env::var("DATABASE_URL") {
        config.database_url = url;
    }

    init_tracing(&config.log_level);
    tracing::info!(addr = %config.server_addr(), "starting praxis-api");

    let pool = create_pool_from_url(&config.database_url).await?;
    run_migrations(&pool).await?;

    let app = create_router(build_state(pool, config.clone()));
    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

/// Wires the PostgreSQL adapters into the domain services
fn build_state(pool: infra_db::DatabasePool, config: ApiConfig) -> AppState {
    let billing_store = Arc::new(PostgresBillingAdapter::new(pool.clone()));
    let patients = Arc::new(PostgresPatientAdapter::new(pool.clone()));
    let sessions = Arc::new(PostgresSessionSource::new(pool.clone()));
    let notifications = Arc::new(LoggingNotificationSink);

    let billing = Arc::new(BillingPeriodService::new(
        billing_store.clone(),
        patients.clone(),
        sessions,
        notifications,
    ));
    let payments = Arc::new(PaymentService::new(billing_store));

    let reconciliation = Arc::new(ReconciliationService::new(Arc::new(
        PostgresReconciliationAdapter::new(pool.clone()),
    )));

    // The real municipal provider adapter plugs in here; outside production
    // deployments the simulated provider issues documents locally.
    if !config.mock_invoice_provider {
        tracing::warn!("no external invoice provider configured; using the simulated provider");
    }
    let invoicing = Arc::new(
        InvoiceService::new(
            Arc::new(PostgresInvoicingAdapter::new(pool)),
            Arc::new(MockInvoiceProvider::new()),
        )
        .with_provider_timeout(Duration::from_millis(config.provider_timeout_ms)),
    );

    AppState {
        billing,
        payments,
        reconciliation,
        invoicing,
        patients,
        config,
    }
}

/// Structured logging; RUST_LOG overrides the configured level
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Resolves when the process is asked to stop, letting in-flight requests
/// finish before the listener closes
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::info!("Ctrl+C received"),
            _ = sigterm.recv() => tracing::info!("SIGTERM received"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("Ctrl+C handler");
        tracing::info!("Ctrl+C received");
    }
}
