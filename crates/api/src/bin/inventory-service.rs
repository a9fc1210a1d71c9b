//! Inventory service entry point.

use api::config::InventoryConfig;
use api::server::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = InventoryConfig::from_env();

    init_tracing(&config.log_level);

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    let state = api::build_inventory_state(&config)
        .await
        .expect("failed to initialise inventory ledger");

    let app = api::create_inventory_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting inventory service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("inventory service shut down gracefully");
}
