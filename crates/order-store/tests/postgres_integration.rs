//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need Docker. Run with:
//!
//! ```bash
//! cargo test -p order-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use domain::{Money, Order, OrderLineItem, OrderStatus};
use order_store::{OrderStore, PostgresOrderStore, StoreError, UserOrderCount, Version};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
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
            sqlx::raw_sql(include_str!(
                "../../../migrations/orders/001_create_orders_tables.sql"
            ))
            .execute(&temp_pool)
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

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresOrderStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE order_line_items, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresOrderStore::new(pool)
}

fn new_order(username: &str) -> Order {
    Order::place(
        username,
        vec![
            OrderLineItem::new("WIDGET", 3, Money::from_cents(1999)),
            OrderLineItem::new("GADGET", 1, Money::from_cents(500)),
            OrderLineItem::new("WIDGET", 2, Money::from_cents(1999)),
        ],
    )
    .unwrap()
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn insert_and_load_order_with_line_items() {
    let store = get_test_store().await;
    let order = new_order("alice");

    assert_eq!(store.insert(&order).await.unwrap(), Version::first());

    let loaded = store.get(order.id()).await.unwrap().unwrap();
    assert_eq!(loaded.order_number(), order.order_number());
    assert_eq!(loaded.username(), "alice");
    assert_eq!(loaded.status(), OrderStatus::PendingValidation);
    assert_eq!(loaded.line_items(), order.line_items());
    assert_eq!(loaded.version(), Version::first());
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn duplicate_insert_is_rejected() {
    let store = get_test_store().await;
    let order = new_order("alice");
    store.insert(&order).await.unwrap();

    let result = store.insert(&order).await;
    assert!(matches!(result, Err(StoreError::DuplicateOrder(_))));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn update_rewrites_line_items_and_bumps_version() {
    let store = get_test_store().await;
    let order = new_order("alice");
    store.insert(&order).await.unwrap();

    let mut loaded = store.get(order.id()).await.unwrap().unwrap();
    loaded
        .set_quantity(&common::ProductCode::new("WIDGET"), 1)
        .unwrap();
    assert_eq!(store.update(&loaded).await.unwrap(), Version::new(2));

    let reloaded = store.get(order.id()).await.unwrap().unwrap();
    assert_eq!(reloaded.line_items().len(), 2);
    assert_eq!(reloaded.line_items()[0].quantity, 1);
    assert_eq!(reloaded.version(), Version::new(2));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn stale_update_is_a_conflict() {
    let store = get_test_store().await;
    let order = new_order("alice");
    store.insert(&order).await.unwrap();

    let mut first = store.get(order.id()).await.unwrap().unwrap();
    let mut second = first.clone();
    first.cancel().unwrap();
    store.update(&first).await.unwrap();

    second.cancel().unwrap();
    let result = store.update(&second).await;
    assert!(matches!(
        result,
        Err(StoreError::ConcurrencyConflict { .. })
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn listing_and_counting_by_username() {
    let store = get_test_store().await;
    for username in ["bob", "alice", "bob"] {
        store.insert(&new_order(username)).await.unwrap();
    }

    assert_eq!(store.list().await.unwrap().len(), 3);
    assert_eq!(store.list_by_username("bob").await.unwrap().len(), 2);

    let counts = store.count_by_username().await.unwrap();
    assert_eq!(
        counts,
        vec![
            UserOrderCount {
                username: "bob".to_string(),
                order_count: 2
            },
            UserOrderCount {
                username: "alice".to_string(),
                order_count: 1
            },
        ]
    );
}
