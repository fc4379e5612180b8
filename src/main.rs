//! academy-payments server binary.

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use academy_payments::adapters::auth::JwtSessionValidator;
use academy_payments::adapters::http::middleware::AuthState;
use academy_payments::adapters::http::{api_router, PaymentAppState};
use academy_payments::adapters::paymob::PaymobGateway;
use academy_payments::adapters::postgres::{
    PostgresEntitlementActivator, PostgresOrderRepository, PostgresPricingCatalog, MIGRATOR,
};
use academy_payments::application::{PaymentDependencies, PaymentOrchestrator};
use academy_payments::config::{AppConfig, ServerConfig};
use academy_payments::domain::payment::SignatureVerifier;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    tracing::info!(
        environment = ?config.server.environment,
        payments_configured = config.payment.is_configured(),
        "Starting academy-payments"
    );

    let pool = config.database.pool_options().connect(&config.database.url).await?;
    if config.database.run_migrations {
        MIGRATOR.run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let payments = build_payments(&config, pool)?;
    let auth: AuthState = Arc::new(JwtSessionValidator::new(config.auth.jwt_config()));

    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);
    let app = api_router(payments, auth)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if server.is_production() {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wires the orchestrator, or the unavailable state when gateway
/// credentials are incomplete.
fn build_payments(config: &AppConfig, pool: sqlx::PgPool) -> Result<PaymentAppState, BoxError> {
    let credentials = match config.payment.credentials() {
        Ok(credentials) => credentials,
        Err(missing) => {
            tracing::warn!(reason = %missing, "Payment gateway not configured, payment endpoints disabled");
            return Ok(PaymentAppState::unavailable());
        }
    };

    let deps = PaymentDependencies {
        gateway: Arc::new(PaymobGateway::new(credentials.gateway)?),
        verifier: Arc::new(SignatureVerifier::new(credentials.hmac_secret)?),
        orders: Arc::new(PostgresOrderRepository::new(pool.clone())),
        entitlements: Arc::new(PostgresEntitlementActivator::new(pool.clone())),
        pricing: Some(Arc::new(PostgresPricingCatalog::new(pool))),
    };

    Ok(PaymentAppState::new(PaymentOrchestrator::new(
        deps,
        config.payment.settings()?,
    )))
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ])
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown signal received");
}
