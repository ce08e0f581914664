use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DbConfig;
use crate::errors::AppError;
use crate::models::{TokenRecord, Unit};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(cfg: &DbConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect_with(cfg.connect_options()?)
            .await?;
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection; the first query does.
    pub fn connect_lazy(cfg: &DbConfig) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(cfg.acquire_timeout)
            .connect_lazy_with(cfg.connect_options()?);
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // -- Unit Operations --

    /// Create the unit's table and its token index if they are missing.
    /// Safe to call any number of times, including concurrently.
    pub async fn create_unit_table(&self, unit: &Unit) -> Result<(), AppError> {
        let table = unit.table_name();
        let mut tx = self.pool.begin().await?;

        // `IF NOT EXISTS` DDL still races on the system catalogs, so
        // provisioning of one table is serialized on an advisory lock that
        // is released with the transaction.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&table)
            .execute(&mut *tx)
            .await?;

        // Identifiers cannot be bound as parameters; `Unit` guarantees
        // the name is `[a-z][a-z0-9_]*`.
        sqlx::query(&format!(
            r#"CREATE TABLE IF NOT EXISTS {table} (
                   id SERIAL PRIMARY KEY,
                   token CHAR(36) NOT NULL,
                   used BOOLEAN DEFAULT FALSE,
                   result INT DEFAULT 0
               )"#
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {table}_token_key ON {table} (token)"
        ))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    // -- Token Operations --

    pub async fn insert_token(&self, unit: &Unit, token: &str) -> Result<i32, AppError> {
        let table = unit.table_name();
        sqlx::query_scalar::<_, i32>(&format!(
            "INSERT INTO {table} (token) VALUES ($1) RETURNING id"
        ))
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::from_unit_query(e, &table))
    }

    pub async fn find_token(
        &self,
        unit: &Unit,
        token: &str,
    ) -> Result<Option<TokenRecord>, AppError> {
        let table = unit.table_name();
        sqlx::query_as::<_, TokenRecord>(&format!(
            r#"SELECT id, token, COALESCE(used, FALSE) AS used, COALESCE(result, 0) AS result
               FROM {table} WHERE token = $1"#
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::from_unit_query(e, &table))
    }
}
