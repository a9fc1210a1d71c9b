//! Order service entry point.

use api::config::Config;
use api::server::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() {
    // 1. Load .env (if any) and configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    // 2. Initialize tracing
    init_tracing(&config.log_level);

    // 3. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 4. Wire the order store and inventory client
    let state = api::build_order_state(&config)
        .await
        .expect("failed to initialise order service");

    // 5. Build the application
    let app = api::create_order_app(state, metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting order service");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("order service shut down gracefully");
}
