// Copyright 2025 LLM Benchkit Contributors
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed result store.
//!
//! Two tables, `benchmark_runs` and `benchmark_results`, linked by a foreign
//! key with `ON DELETE CASCADE` and indexed on `run_id`. Timestamps are stored
//! as RFC 3339 text so they sort chronologically.

use crate::error::{StoreError, StoreResult};
use crate::store::{check_result_bounds, check_run_counts, ResultStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use llm_benchkit_core::{BenchmarkResult, BenchmarkRun, BenchmarkStatus, ModelComparison};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::str::FromStr;
use tokio::sync::watch;
use tracing::{debug, warn};

const SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS benchmark_runs (
        id TEXT PRIMARY KEY NOT NULL,
        model_id TEXT NOT NULL,
        model_name TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT,
        total_prompts INTEGER NOT NULL,
        completed_prompts INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL,
        average_latency REAL NOT NULL DEFAULT 0,
        p99_latency REAL NOT NULL DEFAULT 0,
        min_latency REAL NOT NULL DEFAULT 0,
        max_latency REAL NOT NULL DEFAULT 0,
        tokens_per_second REAL NOT NULL DEFAULT 0
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_benchmark_runs_model_id ON benchmark_runs (model_id)",
    r#"CREATE TABLE IF NOT EXISTS benchmark_results (
        id TEXT PRIMARY KEY NOT NULL,
        run_id TEXT NOT NULL REFERENCES benchmark_runs (id) ON DELETE CASCADE,
        prompt_index INTEGER NOT NULL,
        prompt TEXT NOT NULL,
        response TEXT NOT NULL,
        start_time TEXT NOT NULL,
        end_time TEXT NOT NULL,
        response_time_ms INTEGER NOT NULL,
        token_count INTEGER NOT NULL DEFAULT 0,
        prompt_tokens INTEGER NOT NULL DEFAULT 0,
        response_tokens INTEGER NOT NULL DEFAULT 0,
        context_length INTEGER NOT NULL DEFAULT 0,
        success INTEGER NOT NULL,
        error_message TEXT,
        UNIQUE (run_id, prompt_index)
    )"#,
    "CREATE INDEX IF NOT EXISTS idx_benchmark_results_run_id ON benchmark_results (run_id)",
];

const RUN_COLUMNS: &str = "id, model_id, model_name, start_time, end_time, total_prompts, \
    completed_prompts, status, average_latency, p99_latency, min_latency, max_latency, \
    tokens_per_second";

const RESULT_COLUMNS: &str = "id, run_id, prompt_index, prompt, response, start_time, end_time, \
    response_time_ms, token_count, prompt_tokens, response_tokens, context_length, success, \
    error_message";

#[derive(Debug, FromRow)]
struct RunRow {
    id: String,
    model_id: String,
    model_name: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    total_prompts: i64,
    completed_prompts: i64,
    status: String,
    average_latency: f64,
    p99_latency: f64,
    min_latency: f64,
    max_latency: f64,
    tokens_per_second: f64,
}

impl TryFrom<RunRow> for BenchmarkRun {
    type Error = StoreError;

    fn try_from(row: RunRow) -> StoreResult<Self> {
        let status = BenchmarkStatus::from_str(&row.status)
            .map_err(|e| StoreError::Corrupt(format!("run {}: {}", row.id, e)))?;
        Ok(BenchmarkRun {
            total_prompts: to_u32(row.total_prompts, "total_prompts")?,
            completed_prompts: to_u32(row.completed_prompts, "completed_prompts")?,
            id: row.id,
            model_id: row.model_id,
            model_name: row.model_name,
            start_time: row.start_time,
            end_time: row.end_time,
            status,
            average_latency: row.average_latency,
            p99_latency: row.p99_latency,
            min_latency: row.min_latency,
            max_latency: row.max_latency,
            tokens_per_second: row.tokens_per_second,
        })
    }
}

#[derive(Debug, FromRow)]
struct ResultRow {
    id: String,
    run_id: String,
    prompt_index: i64,
    prompt: String,
    response: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    response_time_ms: i64,
    token_count: i64,
    prompt_tokens: i64,
    response_tokens: i64,
    context_length: i64,
    success: bool,
    error_message: Option<String>,
}

impl TryFrom<ResultRow> for BenchmarkResult {
    type Error = StoreError;

    fn try_from(row: ResultRow) -> StoreResult<Self> {
        Ok(BenchmarkResult {
            prompt_index: to_u32(row.prompt_index, "prompt_index")?,
            response_time_ms: u64::try_from(row.response_time_ms)
                .map_err(|_| StoreError::Corrupt(format!("negative latency in result {}", row.id)))?,
            token_count: to_u32(row.token_count, "token_count")?,
            prompt_tokens: to_u32(row.prompt_tokens, "prompt_tokens")?,
            response_tokens: to_u32(row.response_tokens, "response_tokens")?,
            context_length: to_u32(row.context_length, "context_length")?,
            id: row.id,
            run_id: row.run_id,
            prompt: row.prompt,
            response: row.response,
            start_time: row.start_time,
            end_time: row.end_time,
            success: row.success,
            error_message: row.error_message,
        })
    }
}

#[derive(Debug, FromRow)]
struct ComparisonRow {
    model_id: String,
    model_name: String,
    run_count: i64,
    last_run_time: DateTime<Utc>,
    avg_latency: f64,
    avg_p99_latency: f64,
    avg_tokens_per_second: f64,
}

fn to_u32(value: i64, column: &str) -> StoreResult<u32> {
    u32::try_from(value).map_err(|_| StoreError::Corrupt(format!("{} out of range: {}", column, value)))
}

/// Result store persisted in a SQLite database.
pub struct SqliteStore {
    pool: SqlitePool,
    runs_tx: watch::Sender<Vec<BenchmarkRun>>,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and apply the schema.
    ///
    /// `url` is a SQLite connection string such as `sqlite://benchkit.db`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Open a private in-memory database.
    ///
    /// The pool is pinned to a single connection that never expires, since
    /// every SQLite in-memory connection is its own database.
    pub async fn in_memory() -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::from_pool(pool).await
    }

    /// Wrap an existing pool and apply the schema.
    pub async fn from_pool(pool: SqlitePool) -> StoreResult<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        let (runs_tx, _) = watch::channel(Vec::new());
        let store = Self { pool, runs_tx };
        store.publish().await;
        debug!("SQLite result store ready");
        Ok(store)
    }

    /// Underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn publish(&self) {
        match self.list_runs().await {
            Ok(runs) => {
                self.runs_tx.send_replace(runs);
            }
            Err(e) => warn!(error = %e, "Failed to refresh run list snapshot"),
        }
    }

    async fn stored_status(
        conn: &mut sqlx::SqliteConnection,
        run_id: &str,
    ) -> StoreResult<Option<BenchmarkStatus>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM benchmark_runs WHERE id = ?")
                .bind(run_id)
                .fetch_optional(&mut *conn)
                .await?;
        status
            .map(|s| BenchmarkStatus::from_str(&s).map_err(|e| StoreError::Corrupt(e.to_string())))
            .transpose()
    }
}

#[async_trait]
impl ResultStore for SqliteStore {
    async fn insert_run(&self, run: &BenchmarkRun) -> StoreResult<()> {
        check_run_counts(run)?;
        let mut tx = self.pool.begin().await?;
        if let Some(status) = Self::stored_status(&mut tx, &run.id).await? {
            if status.is_terminal() {
                return Err(StoreError::TerminalRun {
                    run_id: run.id.clone(),
                    status,
                });
            }
        }

        sqlx::query(&format!(
            "INSERT INTO benchmark_runs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT (id) DO UPDATE SET
                model_id = excluded.model_id,
                model_name = excluded.model_name,
                start_time = excluded.start_time,
                end_time = excluded.end_time,
                total_prompts = excluded.total_prompts,
                completed_prompts = excluded.completed_prompts,
                status = excluded.status,
                average_latency = excluded.average_latency,
                p99_latency = excluded.p99_latency,
                min_latency = excluded.min_latency,
                max_latency = excluded.max_latency,
                tokens_per_second = excluded.tokens_per_second",
            RUN_COLUMNS
        ))
        .bind(&run.id)
        .bind(&run.model_id)
        .bind(&run.model_name)
        .bind(run.start_time)
        .bind(run.end_time)
        .bind(run.total_prompts)
        .bind(run.completed_prompts)
        .bind(run.status.as_str())
        .bind(run.average_latency)
        .bind(run.p99_latency)
        .bind(run.min_latency)
        .bind(run.max_latency)
        .bind(run.tokens_per_second)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.publish().await;
        Ok(())
    }

    async fn update_run(&self, run: &BenchmarkRun) -> StoreResult<()> {
        check_run_counts(run)?;
        let mut tx = self.pool.begin().await?;
        match Self::stored_status(&mut tx, &run.id).await? {
            None => return Err(StoreError::RunNotFound(run.id.clone())),
            Some(status) if status.is_terminal() => {
                return Err(StoreError::TerminalRun {
                    run_id: run.id.clone(),
                    status,
                })
            }
            Some(_) => {}
        }

        sqlx::query(
            "UPDATE benchmark_runs SET
                model_id = ?, model_name = ?, start_time = ?, end_time = ?,
                total_prompts = ?, completed_prompts = ?, status = ?,
                average_latency = ?, p99_latency = ?, min_latency = ?, max_latency = ?,
                tokens_per_second = ?
             WHERE id = ?",
        )
        .bind(&run.model_id)
        .bind(&run.model_name)
        .bind(run.start_time)
        .bind(run.end_time)
        .bind(run.total_prompts)
        .bind(run.completed_prompts)
        .bind(run.status.as_str())
        .bind(run.average_latency)
        .bind(run.p99_latency)
        .bind(run.min_latency)
        .bind(run.max_latency)
        .bind(run.tokens_per_second)
        .bind(&run.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.publish().await;
        Ok(())
    }

    async fn insert_result(&self, result: &BenchmarkResult) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        let total: Option<i64> =
            sqlx::query_scalar("SELECT total_prompts FROM benchmark_runs WHERE id = ?")
                .bind(&result.run_id)
                .fetch_optional(&mut *tx)
                .await?;
        let total = total.ok_or_else(|| StoreError::RunNotFound(result.run_id.clone()))?;
        check_result_bounds(result, to_u32(total, "total_prompts")?)?;

        let latency = i64::try_from(result.response_time_ms)
            .map_err(|_| StoreError::Invalid(format!("latency overflow in result {}", result.id)))?;

        let inserted = sqlx::query(&format!(
            "INSERT INTO benchmark_results ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            RESULT_COLUMNS
        ))
        .bind(&result.id)
        .bind(&result.run_id)
        .bind(result.prompt_index)
        .bind(&result.prompt)
        .bind(&result.response)
        .bind(result.start_time)
        .bind(result.end_time)
        .bind(latency)
        .bind(result.token_count)
        .bind(result.prompt_tokens)
        .bind(result.response_tokens)
        .bind(result.context_length)
        .bind(result.success)
        .bind(&result.error_message)
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(StoreError::DuplicateResult {
                    run_id: result.run_id.clone(),
                    prompt_index: result.prompt_index,
                });
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_run(&self, run_id: &str) -> StoreResult<Option<BenchmarkRun>> {
        let row: Option<RunRow> = sqlx::query_as(&format!(
            "SELECT {} FROM benchmark_runs WHERE id = ?",
            RUN_COLUMNS
        ))
        .bind(run_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(BenchmarkRun::try_from).transpose()
    }

    async fn list_runs(&self) -> StoreResult<Vec<BenchmarkRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "SELECT {} FROM benchmark_runs ORDER BY start_time DESC, id ASC",
            RUN_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BenchmarkRun::try_from).collect()
    }

    async fn runs_for_model(&self, model_id: &str) -> StoreResult<Vec<BenchmarkRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(&format!(
            "SELECT {} FROM benchmark_runs WHERE model_id = ? ORDER BY start_time DESC, id ASC",
            RUN_COLUMNS
        ))
        .bind(model_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BenchmarkRun::try_from).collect()
    }

    fn watch_runs(&self) -> watch::Receiver<Vec<BenchmarkRun>> {
        self.runs_tx.subscribe()
    }

    async fn results_for_run(&self, run_id: &str) -> StoreResult<Vec<BenchmarkResult>> {
        let rows: Vec<ResultRow> = sqlx::query_as(&format!(
            "SELECT {} FROM benchmark_results WHERE run_id = ? ORDER BY prompt_index",
            RESULT_COLUMNS
        ))
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(BenchmarkResult::try_from).collect()
    }

    async fn response_times(&self, run_id: &str) -> StoreResult<Vec<u64>> {
        let times: Vec<i64> = sqlx::query_scalar(
            "SELECT response_time_ms FROM benchmark_results
             WHERE run_id = ? AND success = 1
             ORDER BY response_time_ms",
        )
        .bind(run_id)
        .fetch_all(&self.pool)
        .await?;
        times
            .into_iter()
            .map(|t| u64::try_from(t).map_err(|_| StoreError::Corrupt(format!("negative latency {}", t))))
            .collect()
    }

    async fn delete_run(&self, run_id: &str) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM benchmark_runs WHERE id = ?")
            .bind(run_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if deleted > 0 {
            self.publish().await;
        }
        Ok(deleted > 0)
    }

    async fn delete_all_runs(&self) -> StoreResult<u64> {
        let deleted = sqlx::query("DELETE FROM benchmark_runs")
            .execute(&self.pool)
            .await?
            .rows_affected();
        self.publish().await;
        Ok(deleted)
    }

    async fn model_comparisons(&self) -> StoreResult<Vec<ModelComparison>> {
        let rows: Vec<ComparisonRow> = sqlx::query_as(
            "SELECT
                model_id,
                model_name,
                COUNT(*) AS run_count,
                MAX(start_time) AS last_run_time,
                AVG(average_latency) AS avg_latency,
                AVG(p99_latency) AS avg_p99_latency,
                AVG(tokens_per_second) AS avg_tokens_per_second
             FROM benchmark_runs
             WHERE status = 'COMPLETED'
             GROUP BY model_id, model_name
             ORDER BY avg_latency ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ModelComparison {
                    run_count: to_u32(row.run_count, "run_count")?,
                    model_id: row.model_id,
                    model_name: row.model_name,
                    last_run_time: row.last_run_time,
                    avg_latency: row.avg_latency,
                    avg_p99_latency: row.avg_p99_latency,
                    avg_tokens_per_second: row.avg_tokens_per_second,
                })
            })
            .collect()
    }
}
