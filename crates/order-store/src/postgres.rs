use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{Money, NewOrder, Order, OrderChanges, OrderId, OrderItem};
use sqlx::{
    PgPool, Postgres, Row, Transaction,
    postgres::{PgPoolOptions, PgRow},
};

use crate::{
    OrderStoreError, Result,
    store::{OrderStore, UpdateOptions, check_expected_status},
};

const ORDER_COLUMNS: &str = "id, student_name, student_id, items, total_cents, status, \
     payment_method, payment_status, pickup_time, order_time, updated_at";

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

    /// Opens a connection pool to `url` with at most `max_connections`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let items: Vec<OrderItem> = serde_json::from_value(row.try_get("items")?)?;
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;

        Ok(Order {
            id: OrderId::new(row.try_get::<String, _>("id")?),
            student_name: row.try_get("student_name")?,
            student_id: row.try_get("student_id")?,
            items,
            total: Money::from_cents(row.try_get("total_cents")?),
            status: status
                .parse()
                .map_err(|e| OrderStoreError::Corrupt(format!("{e}")))?,
            payment_method: row.try_get("payment_method")?,
            payment_status: payment_status
                .parse()
                .map_err(|e| OrderStoreError::Corrupt(format!("{e}")))?,
            pickup_time: row.try_get("pickup_time")?,
            order_time: row.try_get::<DateTime<Utc>, _>("order_time")?,
            updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
        })
    }

    /// Inserts `order`, returning false if the id is already taken.
    async fn insert(&self, order: &Order) -> Result<bool> {
        let items = serde_json::to_value(&order.items)?;

        let result = sqlx::query(
            r#"
            INSERT INTO orders (id, student_name, student_id, items, total_cents, status,
                                payment_method, payment_status, pickup_time, order_time, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(order.id.as_str())
        .bind(&order.student_name)
        .bind(&order.student_id)
        .bind(items)
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .bind(&order.pickup_time)
        .bind(order.order_time)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn lock_row(tx: &mut Transaction<'_, Postgres>, id: &OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut **tx)
            .await?;

        row.map(Self::row_to_order).transpose()
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    #[tracing::instrument(skip(self, order))]
    async fn create(&self, order: NewOrder) -> Result<Order> {
        let now = Utc::now();

        // Codes already taken by imported orders are skipped
        loop {
            let sequence: i64 = sqlx::query_scalar("SELECT nextval('order_number_seq')")
                .fetch_one(&self.pool)
                .await?;

            let candidate = order.clone().into_order(OrderId::from_sequence(sequence), now);
            if self.insert(&candidate).await? {
                return Ok(candidate);
            }
            tracing::debug!(id = %candidate.id, "order code taken, drawing next sequence value");
        }
    }

    #[tracing::instrument(skip(self, order), fields(id = %order.id))]
    async fn import(&self, order: Order) -> Result<Order> {
        if self.insert(&order).await? {
            Ok(order)
        } else {
            Err(OrderStoreError::DuplicateId(order.id))
        }
    }

    async fn get_all(&self) -> Result<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn get_by_id(&self, id: &OrderId) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: Option<PgRow> = sqlx::query(&sql)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    #[tracing::instrument(skip(self, changes))]
    async fn update(
        &self,
        id: &OrderId,
        changes: OrderChanges,
        options: UpdateOptions,
    ) -> Result<Order> {
        let mut tx = self.pool.begin().await?;

        let mut order = Self::lock_row(&mut tx, id)
            .await?
            .ok_or_else(|| OrderStoreError::NotFound(id.clone()))?;

        check_expected_status(id, &options, order.status)?;

        order.merge(changes, Utc::now());
        let items = serde_json::to_value(&order.items)?;

        sqlx::query(
            r#"
            UPDATE orders SET
                student_name = $2,
                student_id = $3,
                items = $4,
                total_cents = $5,
                status = $6,
                payment_method = $7,
                payment_status = $8,
                pickup_time = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(order.id.as_str())
        .bind(&order.student_name)
        .bind(&order.student_id)
        .bind(items)
        .bind(order.total.cents())
        .bind(order.status.as_str())
        .bind(&order.payment_method)
        .bind(order.payment_status.as_str())
        .bind(&order.pickup_time)
        .bind(order.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(order)
    }

    #[tracing::instrument(skip(self))]
    async fn delete(&self, id: &OrderId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
