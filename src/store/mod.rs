//! Persistence for batch selection results.


use crate::error::Result;
use crate::types::{BatchMeta, DecisionRecord};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};

/// Collaborator that records one batch of decisions.
///
/// Called once per batch after all stocks are processed; a failure is
/// logged by the caller and never rolls back computed decisions.
#[async_trait]
pub trait SelectionStore: Send + Sync {
    async fn save(
        &self,
        records: &[DecisionRecord],
        date: NaiveDate,
        meta: &BatchMeta,
    ) -> Result<()>;
}

/// SQLite-backed store, one row per decision.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS selections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                strategy TEXT NOT NULL,
                stock_code TEXT NOT NULL,
                stock_name TEXT NOT NULL,
                meets_criteria INTEGER NOT NULL,
                reason TEXT NOT NULL,
                score REAL NOT NULL,
                analysis TEXT NOT NULL,
                decided_at TEXT NOT NULL,
                execution_secs REAL NOT NULL,
                accepted_count INTEGER NOT NULL,
                total_count INTEGER NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SelectionStore for SqliteStore {
    async fn save(
        &self,
        records: &[DecisionRecord],
        date: NaiveDate,
        meta: &BatchMeta,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for record in records {
            let analysis = serde_json::to_string(&record.result)?;
            sqlx::query(
                r#"
                INSERT INTO selections (
                    date, strategy, stock_code, stock_name, meets_criteria,
                    reason, score, analysis, decided_at,
                    execution_secs, accepted_count, total_count
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(date)
            .bind(&meta.strategy)
            .bind(&record.stock_code)
            .bind(&record.stock_name)
            .bind(record.meets_criteria)
            .bind(&record.reason)
            .bind(record.result.score)
            .bind(analysis)
            .bind(record.decided_at)
            .bind(meta.execution_secs)
            .bind(meta.accepted as i64)
            .bind(meta.total as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("persisted {} decision records for {}", records.len(), date);
        Ok(())
    }
}

/// No-op store for dry runs and one-off analyses.
pub struct NullStore;

#[async_trait]
impl SelectionStore for NullStore {
    async fn save(
        &self,
        records: &[DecisionRecord],
        _date: NaiveDate,
        _meta: &BatchMeta,
    ) -> Result<()> {
        tracing::debug!("null store: discarding {} records", records.len());
        Ok(())
    }
}
