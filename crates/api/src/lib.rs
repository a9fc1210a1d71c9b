//! HTTP services for order fulfillment.
//!
//! Two services are built from this crate:
//!
//! - the order service, exposing order placement, cancellation, amendment
//!   and queries on top of the saga crate;
//! - the inventory service, exposing the inventory ledger that the order
//!   service reaches over HTTP when `INVENTORY_URL` is set.
//!
//! Both carry structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use inventory::{
    InMemoryInventoryLedger, InventoryLedger, PostgresInventoryLedger, seed_demo_inventory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{InMemoryOrderStore, OrderStore, PostgresOrderStore};
use saga::{HttpInventoryClient, InventoryClient, LedgerInventoryClient};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::{Config, InventoryConfig};
use error::StartupError;
use routes::inventory::InventoryState;
use routes::orders::AppState;

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn metrics_router(metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle)
}

/// Creates the order service router.
pub fn create_order_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/health", get(routes::health::order_service))
        .route(
            "/orders",
            post(routes::orders::place).get(routes::orders::list),
        )
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/validate", post(routes::orders::validate))
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route(
            "/orders/{id}/items/{product_code}",
            put(routes::orders::amend),
        )
        .route(
            "/users/{username}/orders",
            get(routes::orders::list_by_username),
        )
        .route(
            "/stats/orders-per-user",
            get(routes::orders::orders_per_user),
        )
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

/// Creates the inventory service router.
pub fn create_inventory_app(
    state: Arc<InventoryState>,
    metrics_handle: PrometheusHandle,
) -> Router {
    Router::new()
        .route("/health", get(routes::health::inventory_service))
        .route("/inventory", get(routes::inventory::list))
        .route(
            "/inventory/{product_code}/available",
            get(routes::inventory::available),
        )
        .route(
            "/inventory/{product_code}/quantity",
            get(routes::inventory::quantity),
        )
        .route("/inventory/adjust", post(routes::inventory::adjust))
        .route("/inventory/try-adjust", post(routes::inventory::try_adjust))
        .with_state(state)
        .merge(metrics_router(metrics_handle))
        .layer(cors())
        .layer(TraceLayer::new_for_http())
}

async fn connect(database_url: &str) -> Result<sqlx::PgPool, StartupError> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Opens the configured ledger: PostgreSQL when a database URL is given,
/// in-memory otherwise. Seeds demo stock when asked to.
pub async fn open_ledger(
    database_url: Option<&str>,
    seed_data: bool,
) -> Result<Arc<dyn InventoryLedger>, StartupError> {
    let ledger: Arc<dyn InventoryLedger> = match database_url {
        Some(url) => {
            let ledger = PostgresInventoryLedger::new(connect(url).await?);
            ledger.run_migrations().await?;
            tracing::info!("using PostgreSQL inventory ledger");
            Arc::new(ledger)
        }
        None => {
            tracing::info!("using in-memory inventory ledger");
            Arc::new(InMemoryInventoryLedger::new())
        }
    };

    if seed_data {
        seed_demo_inventory(ledger.as_ref()).await?;
    }
    Ok(ledger)
}

/// Wires the order service from its configuration.
pub async fn build_order_state(config: &Config) -> Result<Arc<AppState>, StartupError> {
    let store: Arc<dyn OrderStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresOrderStore::new(connect(url).await?);
            store.run_migrations().await?;
            tracing::info!("using PostgreSQL order store");
            Arc::new(store)
        }
        None => {
            tracing::info!("using in-memory order store");
            Arc::new(InMemoryOrderStore::new())
        }
    };

    let inventory: Arc<dyn InventoryClient> = match &config.inventory_url {
        Some(url) => {
            tracing::info!(
                %url,
                timeout_ms = config.inventory_timeout.as_millis() as u64,
                "using remote inventory service"
            );
            Arc::new(HttpInventoryClient::new(url, config.inventory_timeout)?)
        }
        None => {
            let ledger = open_ledger(config.database_url.as_deref(), config.seed_data).await?;
            Arc::new(LedgerInventoryClient::new(ledger))
        }
    };

    Ok(Arc::new(AppState::new(store, inventory)))
}

/// Wires the inventory service from its configuration.
pub async fn build_inventory_state(
    config: &InventoryConfig,
) -> Result<Arc<InventoryState>, StartupError> {
    let ledger = open_ledger(config.database_url.as_deref(), config.seed_data).await?;
    Ok(Arc::new(InventoryState::new(ledger)))
}
