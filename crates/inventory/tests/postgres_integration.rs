//! PostgreSQL integration tests for the inventory ledger
//!
//! These tests use a shared PostgreSQL container and need Docker. Run with:
//!
//! ```bash
//! cargo test -p inventory --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use futures_util::future::join_all;
use inventory::{
    AdjustOutcome, InventoryError, InventoryLedger, InventoryRecord, PostgresInventoryLedger,
    ProductCode, StockAdjustment, seed_demo_inventory,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresInventoryLedger::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

async fn get_test_ledger() -> PostgresInventoryLedger {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE inventory")
        .execute(&pool)
        .await
        .unwrap();

    PostgresInventoryLedger::new(pool)
}

fn code(s: &str) -> ProductCode {
    ProductCode::new(s)
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn adjust_creates_and_accumulates() {
    let ledger = get_test_ledger().await;

    ledger
        .adjust(StockAdjustment::pieces("WIDGET", 5))
        .await
        .unwrap();
    let record = ledger
        .adjust(StockAdjustment::cartons("WIDGET", 2, Some(10)))
        .await
        .unwrap();

    assert_eq!(record, InventoryRecord::new("WIDGET", 25));
    assert!(ledger.check_available(&code("WIDGET"), 25).await.unwrap());
    assert!(!ledger.check_available(&code("GADGET"), 1).await.unwrap());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn unconditional_adjust_may_go_negative() {
    let ledger = get_test_ledger().await;

    let record = ledger
        .adjust(StockAdjustment::pieces("WIDGET", -3))
        .await
        .unwrap();
    assert_eq!(record.quantity, -3);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn counter_overflow_is_rejected_and_leaves_record() {
    let ledger = get_test_ledger().await;

    ledger
        .adjust(StockAdjustment::pieces("OVERFLOW", i64::MAX))
        .await
        .unwrap();

    let result = ledger.adjust(StockAdjustment::pieces("OVERFLOW", 1)).await;
    assert!(matches!(result, Err(InventoryError::Overflow(_))));

    let result = ledger.try_adjust(&code("OVERFLOW"), 1).await;
    assert!(matches!(result, Err(InventoryError::Overflow(_))));

    assert_eq!(ledger.get_quantity(&code("OVERFLOW")).await.unwrap(), i64::MAX);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn try_adjust_refuses_and_reports_available() {
    let ledger = get_test_ledger().await;
    ledger
        .adjust(StockAdjustment::pieces("WIDGET", 2))
        .await
        .unwrap();

    let outcome = ledger.try_adjust(&code("WIDGET"), -3).await.unwrap();
    assert_eq!(outcome, AdjustOutcome::Insufficient { available: 2 });

    let outcome = ledger.try_adjust(&code("MISSING"), -1).await.unwrap();
    assert_eq!(outcome, AdjustOutcome::Insufficient { available: 0 });
    assert_eq!(ledger.get_quantity(&code("MISSING")).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn concurrent_try_adjust_never_oversells() {
    let ledger = get_test_ledger().await;
    ledger
        .adjust(StockAdjustment::pieces("WIDGET", 10))
        .await
        .unwrap();

    let widget = code("WIDGET");
    let outcomes = join_all((0..25).map(|_| ledger.try_adjust(&widget, -1))).await;
    let applied = outcomes
        .into_iter()
        .filter(|o| o.as_ref().unwrap().is_applied())
        .count();

    assert_eq!(applied, 10);
    assert_eq!(ledger.get_quantity(&widget).await.unwrap(), 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn seed_then_list_sorted() {
    let ledger = get_test_ledger().await;

    assert_eq!(seed_demo_inventory(&ledger).await.unwrap(), 3);
    assert_eq!(seed_demo_inventory(&ledger).await.unwrap(), 0);

    let codes: Vec<_> = ledger
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.product_code.to_string())
        .collect();
    assert_eq!(codes, vec!["DELL-XPS-15", "GALAXY-BUDS-2", "IPHONE-15-PRO"]);
}
