use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::{
    AdjustOutcome, InventoryError, InventoryRecord, ProductCode, Result, StockAdjustment,
    ledger::InventoryLedger,
};

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_VALUE_OUT_OF_RANGE: &str = "22003";

/// Maps a bigint overflow on a product's counter to [`InventoryError::Overflow`].
fn overflow_aware(product_code: &ProductCode, err: sqlx::Error) -> InventoryError {
    let out_of_range = matches!(
        &err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some(NUMERIC_VALUE_OUT_OF_RANGE)
    );
    if out_of_range {
        InventoryError::Overflow(product_code.clone())
    } else {
        InventoryError::Database(err)
    }
}

/// PostgreSQL-backed inventory ledger.
///
/// Each adjustment is a single statement, so the row lock taken by
/// PostgreSQL serializes concurrent changes to one product code.
#[derive(Clone)]
pub struct PostgresInventoryLedger {
    pool: PgPool,
}

impl PostgresInventoryLedger {
    /// Creates a new PostgreSQL inventory ledger.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    ///
    /// Versions applied by the order store in a shared database are ignored.
    pub async fn run_migrations(&self) -> Result<()> {
        let mut migrator = sqlx::migrate!("../../migrations/inventory");
        migrator.set_ignore_missing(true);
        migrator.run(&self.pool).await?;
        Ok(())
    }

    async fn upsert(&self, product_code: &ProductCode, delta: i64) -> Result<InventoryRecord> {
        let quantity: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO inventory (product_code, quantity)
            VALUES ($1, $2)
            ON CONFLICT (product_code)
            DO UPDATE SET quantity = inventory.quantity + EXCLUDED.quantity
            RETURNING quantity
            "#,
        )
        .bind(product_code.as_str())
        .bind(delta)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| overflow_aware(product_code, e))?;

        Ok(InventoryRecord::new(product_code.clone(), quantity))
    }

    async fn quantity_of(&self, product_code: &ProductCode) -> Result<Option<i64>> {
        let quantity = sqlx::query_scalar("SELECT quantity FROM inventory WHERE product_code = $1")
            .bind(product_code.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(quantity)
    }
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    async fn check_available(&self, product_code: &ProductCode, quantity: i64) -> Result<bool> {
        Ok(self
            .quantity_of(product_code)
            .await?
            .is_some_and(|current| current >= quantity))
    }

    #[tracing::instrument(skip(self), fields(product_code = %adjustment.product_code))]
    async fn adjust(&self, adjustment: StockAdjustment) -> Result<InventoryRecord> {
        let delta = adjustment.delta_in_pieces()?;
        let record = self.upsert(&adjustment.product_code, delta).await?;

        metrics::counter!("inventory_adjustments_total", "kind" => "unconditional").increment(1);
        tracing::debug!(delta, quantity = record.quantity, "Stock adjusted");

        Ok(record)
    }

    #[tracing::instrument(skip(self))]
    async fn try_adjust(&self, product_code: &ProductCode, delta: i64) -> Result<AdjustOutcome> {
        if delta >= 0 {
            let record = self.upsert(product_code, delta).await?;
            metrics::counter!("inventory_adjustments_total", "kind" => "conditional")
                .increment(1);
            return Ok(AdjustOutcome::Applied(record));
        }

        let row = sqlx::query(
            r#"
            UPDATE inventory
            SET quantity = quantity + $2
            WHERE product_code = $1 AND quantity + $2 >= 0
            RETURNING quantity
            "#,
        )
        .bind(product_code.as_str())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| overflow_aware(product_code, e))?;

        if let Some(row) = row {
            metrics::counter!("inventory_adjustments_total", "kind" => "conditional")
                .increment(1);
            return Ok(AdjustOutcome::Applied(InventoryRecord::new(
                product_code.clone(),
                row.try_get("quantity")?,
            )));
        }

        let available = self.quantity_of(product_code).await?.unwrap_or(0);
        metrics::counter!("inventory_adjustments_total", "kind" => "refused").increment(1);
        tracing::debug!(available, "Conditional adjustment refused");

        Ok(AdjustOutcome::Insufficient { available })
    }

    async fn get_quantity(&self, product_code: &ProductCode) -> Result<i64> {
        Ok(self.quantity_of(product_code).await?.unwrap_or(0))
    }

    async fn list(&self) -> Result<Vec<InventoryRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT product_code, quantity
            FROM inventory
            ORDER BY product_code ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<InventoryRecord> {
                Ok(InventoryRecord::new(
                    ProductCode::new(row.try_get::<String, _>("product_code")?),
                    row.try_get("quantity")?,
                ))
            })
            .collect()
    }
}
