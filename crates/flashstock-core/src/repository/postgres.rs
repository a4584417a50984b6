use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Durable-store handle. Wraps a `sqlx::PgPool`; repositories borrow it
/// rather than opening their own connections.
#[derive(Clone)]
pub struct Database {
    pool: Pool<Postgres>,
}

impl Database {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    tracing::info!(host = %config.host, database = %config.database, "connecting to postgres");

    let pool = PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
        .connect(&config.connection_string())
        .await
        .map_err(Error::Database)?;

    tracing::info!("postgres connected");
    Ok(pool)
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub sku: String,
    pub quantity: i64,
    pub price_per_unit: Decimal,
}

#[derive(Debug, Clone)]
pub struct Order {
    pub order_id: String,
    pub user_id: String,
    pub status: String,
    pub total_amount: Decimal,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub items: Vec<OrderLine>,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn create_order_with_items(
        &self,
        order_id: &str,
        user_id: &str,
        items: &[OrderLine],
    ) -> Result<Order>;

    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>>;
}

pub struct PostgresOrderRepository {
    pool: PgPool,
}

impl PostgresOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderRepository for PostgresOrderRepository {
    async fn create_order_with_items(
        &self,
        order_id: &str,
        user_id: &str,
        items: &[OrderLine],
    ) -> Result<Order> {
        let total: Decimal = items
            .iter()
            .map(|item| item.price_per_unit * Decimal::from(item.quantity))
            .sum();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let created_at: chrono::DateTime<chrono::Utc> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (order_id, user_id, status, total_amount)
            VALUES ($1, $2, 'confirmed', $3)
            RETURNING created_at
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .bind(total)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, sku, quantity, price_per_unit)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(order_id)
            .bind(&item.sku)
            .bind(item.quantity)
            .bind(item.price_per_unit)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        tx.commit().await.map_err(Error::Database)?;

        Ok(Order {
            order_id: order_id.to_string(),
            user_id: user_id.to_string(),
            status: "confirmed".to_string(),
            total_amount: total,
            created_at,
            items: items.to_vec(),
        })
    }

    async fn find_by_id(&self, order_id: &str) -> Result<Option<Order>> {
        let row = sqlx::query_as::<_, (String, String, String, Decimal, chrono::DateTime<chrono::Utc>)>(
            "SELECT order_id, user_id, status, total_amount, created_at FROM orders WHERE order_id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        let Some((order_id, user_id, status, total_amount, created_at)) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query_as::<_, (String, i64, Decimal)>(
            "SELECT sku, quantity, price_per_unit FROM order_items WHERE order_id = $1",
        )
        .bind(&order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let items = item_rows
            .into_iter()
            .map(|(sku, quantity, price_per_unit)| OrderLine {
                sku,
                quantity,
                price_per_unit,
            })
            .collect();

        Ok(Some(Order {
            order_id,
            user_id,
            status,
            total_amount,
            created_at,
            items,
        }))
    }
}

#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record(
        &self,
        event_type: &str,
        user_id: &str,
        sku: Option<&str>,
        reservation_id: Option<&str>,
        details: serde_json::Value,
    ) -> Result<()>;
}

pub struct PostgresAuditRepository {
    pool: PgPool,
}

impl PostgresAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for PostgresAuditRepository {
    async fn record(
        &self,
        event_type: &str,
        user_id: &str,
        sku: Option<&str>,
        reservation_id: Option<&str>,
        details: serde_json::Value,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (event_type, user_id, sku, reservation_id, details)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event_type)
        .bind(user_id)
        .bind(sku)
        .bind(reservation_id)
        .bind(details)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}
