use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ProductCode;
use domain::{Money, Order, OrderLineItem, OrderNumber, OrderStatus};
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderId, Result, StoreError, Version,
    store::{OrderStore, UserOrderCount},
};

/// PostgreSQL-backed order store implementation.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    ///
    /// The inventory ledger may share the database and its own migrations,
    /// so versions applied by it are ignored here.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        let mut migrator = sqlx::migrate!("../../migrations/orders");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await
    }

    async fn insert_line_items(
        tx: &mut Transaction<'_, Postgres>,
        order: &Order,
    ) -> Result<()> {
        for (position, item) in order.line_items().iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO order_line_items (order_id, position, product_code, price_cents, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id().as_uuid())
            .bind(position as i32)
            .bind(item.product_code.as_str())
            .bind(item.price.cents())
            .bind(item.quantity as i64)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    /// Loads line items for the given orders, grouped by order and in position order.
    async fn load_line_items(
        &self,
        order_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<OrderLineItem>>> {
        let rows = sqlx::query(
            r#"
            SELECT order_id, product_code, price_cents, quantity
            FROM order_line_items
            WHERE order_id = ANY($1)
            ORDER BY order_id, position ASC
            "#,
        )
        .bind(order_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<OrderLineItem>> = HashMap::new();
        for row in rows {
            let order_id: Uuid = row.try_get("order_id")?;
            let quantity: i64 = row.try_get("quantity")?;
            let quantity = u32::try_from(quantity).map_err(|_| {
                StoreError::InvalidRecord(format!(
                    "line quantity {quantity} out of range for order {order_id}"
                ))
            })?;
            grouped.entry(order_id).or_default().push(OrderLineItem {
                product_code: ProductCode::new(row.try_get::<String, _>("product_code")?),
                price: Money::from_cents(row.try_get("price_cents")?),
                quantity,
            });
        }
        Ok(grouped)
    }

    async fn rows_to_orders(&self, rows: Vec<PgRow>) -> Result<Vec<Order>> {
        let ids: Vec<Uuid> = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id"))
            .collect::<std::result::Result<_, _>>()?;
        let mut line_items = self.load_line_items(&ids).await?;

        rows.into_iter()
            .map(|row| -> Result<Order> {
                let id: Uuid = row.try_get("id")?;
                let status: String = row.try_get("status")?;
                let status = status
                    .parse::<OrderStatus>()
                    .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

                Ok(Order::rehydrate(
                    OrderId::from_uuid(id),
                    OrderNumber::new(row.try_get::<String, _>("order_number")?),
                    row.try_get("username")?,
                    status,
                    line_items.remove(&id).unwrap_or_default(),
                    Version::new(row.try_get("version")?),
                    row.try_get::<DateTime<Utc>, _>("created_at")?,
                ))
            })
            .collect()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order), fields(order_id = %order.id()))]
    async fn insert(&self, order: &Order) -> Result<Version> {
        if order.version() != Version::initial() {
            return Err(StoreError::ConcurrencyConflict {
                order_id: order.id(),
                expected: order.version(),
                actual: Version::initial(),
            });
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, order_number, username, status, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(order.id().as_uuid())
        .bind(order.order_number().as_str())
        .bind(order.username())
        .bind(order.status().as_str())
        .bind(Version::first().as_i64())
        .bind(order.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("orders_pkey")
            {
                return StoreError::DuplicateOrder(order.id());
            }
            StoreError::Database(e)
        })?;

        Self::insert_line_items(&mut tx, order).await?;

        tx.commit().await?;
        Ok(Version::first())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, username, status, version, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(self.rows_to_orders(rows).await?.into_iter().next())
    }

    #[tracing::instrument(skip(self, order), fields(order_id = %order.id(), version = %order.version()))]
    async fn update(&self, order: &Order) -> Result<Version> {
        let order_id = order.id();
        let expected = order.version();
        let next = expected.next();

        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE orders SET status = $2, version = $3
            WHERE id = $1 AND version = $4
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(order.status().as_str())
        .bind(next.as_i64())
        .bind(expected.as_i64())
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&mut *tx)
                .await?;

            return Err(match actual {
                Some(actual) => StoreError::ConcurrencyConflict {
                    order_id,
                    expected,
                    actual: Version::new(actual),
                },
                None => StoreError::OrderNotFound(order_id),
            });
        }

        sqlx::query("DELETE FROM order_line_items WHERE order_id = $1")
            .bind(order_id.as_uuid())
            .execute(&mut *tx)
            .await?;
        Self::insert_line_items(&mut tx, order).await?;

        tx.commit().await?;
        Ok(next)
    }

    async fn list(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, username, status, version, created_at
            FROM orders
            ORDER BY seq ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        self.rows_to_orders(rows).await
    }

    async fn list_by_username(&self, username: &str) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_number, username, status, version, created_at
            FROM orders
            WHERE username = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        self.rows_to_orders(rows).await
    }

    async fn count_by_username(&self) -> Result<Vec<UserOrderCount>> {
        let rows = sqlx::query(
            r#"
            SELECT username, COUNT(*) AS order_count
            FROM orders
            GROUP BY username
            ORDER BY MIN(seq) ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<UserOrderCount> {
                let count: i64 = row.try_get("order_count")?;
                Ok(UserOrderCount {
                    username: row.try_get("username")?,
                    order_count: count as u64,
                })
            })
            .collect()
    }
}
