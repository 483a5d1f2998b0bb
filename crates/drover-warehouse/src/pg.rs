//! PostgreSQL implementation of [`WarehouseClient`].
//!
//! Reads the `pipeline_metrics` table kept in sync by the provider
//! webhook importer. All aggregates are cast to float8/int8 in SQL so
//! row decoding stays plain `f64`/`i64`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use drover_protocol::analytics::{DurationStats, FailurePattern, PipelineMetrics, TrendWeek};

use crate::WarehouseClient;
use crate::error::{WarehouseError, WarehouseResult};

/// Warehouse backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgWarehouse {
    pool: PgPool,
}

impl PgWarehouse {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with a small bounded pool.
    pub async fn connect(database_url: &str) -> WarehouseResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }
}

/// Resolve a reporting window to its cutoff timestamp.
fn cutoff_for(time_range: &str, now: DateTime<Utc>) -> WarehouseResult<DateTime<Utc>> {
    match time_range {
        "last_7_days" => Ok(now - Duration::days(7)),
        "last_30_days" => Ok(now - Duration::days(30)),
        "today" => Ok(now - Duration::days(1)),
        other => Err(WarehouseError::BadTimeRange(other.to_string())),
    }
}

#[derive(sqlx::FromRow)]
struct DurationRow {
    avg_duration_secs: Option<f64>,
    sample_size: i64,
    stddev_duration: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct PatternRow {
    hour_of_day: i32,
    day_of_week: i32,
    total_runs: i64,
    failures: i64,
    failure_rate: f64,
}

#[derive(sqlx::FromRow)]
struct TrendRow {
    week: DateTime<Utc>,
    total_runs: i64,
    avg_duration_secs: f64,
    success_rate: f64,
    avg_cost_usd: f64,
    prev_week_duration: Option<f64>,
    prev_week_success_rate: Option<f64>,
}

#[derive(sqlx::FromRow)]
struct MetricsRow {
    total_runs: i64,
    successful_runs: i64,
    failed_runs: i64,
    success_rate: f64,
    avg_duration_mins: f64,
}

#[async_trait]
impl WarehouseClient for PgWarehouse {
    async fn get_average_duration(
        &self,
        project_id: &str,
        ref_name: &str,
        last_n_days: i32,
    ) -> WarehouseResult<Option<DurationStats>> {
        let cutoff = Utc::now() - Duration::days(i64::from(last_n_days));
        let row: DurationRow = sqlx::query_as(
            "SELECT AVG(duration_seconds)::float8 AS avg_duration_secs,
                    COUNT(*) AS sample_size,
                    STDDEV(duration_seconds)::float8 AS stddev_duration
             FROM pipeline_metrics
             WHERE project_id = $1
               AND ref = $2
               AND status = 'success'
               AND created_at >= $3",
        )
        .bind(project_id)
        .bind(ref_name)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.avg_duration_secs.map(|avg| DurationStats {
            avg_duration_secs: avg,
            sample_size: row.sample_size,
            stddev_duration: row.stddev_duration,
        }))
    }

    async fn get_failure_patterns(
        &self,
        project_id: &str,
    ) -> WarehouseResult<Vec<FailurePattern>> {
        let cutoff = Utc::now() - Duration::days(30);
        let rows: Vec<PatternRow> = sqlx::query_as(
            "SELECT hour_of_day,
                    day_of_week,
                    COUNT(*) AS total_runs,
                    SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS failures,
                    (SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END)::float8
                        / COUNT(*)::float8) * 100 AS failure_rate
             FROM pipeline_metrics
             WHERE project_id = $1
               AND created_at >= $2
             GROUP BY hour_of_day, day_of_week
             HAVING COUNT(*) > 5
             ORDER BY failure_rate DESC",
        )
        .bind(project_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| FailurePattern {
                hour_of_day: r.hour_of_day,
                day_of_week: r.day_of_week,
                total_runs: r.total_runs,
                failures: r.failures,
                failure_rate: r.failure_rate,
            })
            .collect())
    }

    async fn get_pipeline_trends(&self, project_id: &str) -> WarehouseResult<Vec<TrendWeek>> {
        let cutoff = Utc::now() - Duration::weeks(12);
        let rows: Vec<TrendRow> = sqlx::query_as(
            "WITH weekly_stats AS (
                 SELECT date_trunc('week', created_at) AS week,
                        COUNT(*) AS total_runs,
                        AVG(duration_seconds)::float8 AS avg_duration_secs,
                        (SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END)::float8
                            / COUNT(*)::float8) * 100 AS success_rate,
                        AVG(estimated_cost_usd)::float8 AS avg_cost_usd
                 FROM pipeline_metrics
                 WHERE project_id = $1
                   AND created_at >= $2
                 GROUP BY week
             )
             SELECT week, total_runs, avg_duration_secs, success_rate, avg_cost_usd,
                    LAG(avg_duration_secs) OVER (ORDER BY week) AS prev_week_duration,
                    LAG(success_rate) OVER (ORDER BY week) AS prev_week_success_rate
             FROM weekly_stats
             ORDER BY week DESC",
        )
        .bind(project_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| TrendWeek {
                week: r.week,
                total_runs: r.total_runs,
                avg_duration_secs: r.avg_duration_secs,
                success_rate: r.success_rate,
                avg_cost_usd: r.avg_cost_usd,
                prev_week_duration: r.prev_week_duration,
                prev_week_success_rate: r.prev_week_success_rate,
            })
            .collect())
    }

    async fn get_pipeline_metrics(
        &self,
        project_id: &str,
        time_range: &str,
    ) -> WarehouseResult<PipelineMetrics> {
        let cutoff = cutoff_for(time_range, Utc::now())?;
        let row: MetricsRow = sqlx::query_as(
            "SELECT COUNT(*) AS total_runs,
                    COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0) AS successful_runs,
                    COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed_runs,
                    COALESCE((SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END)::float8
                        / NULLIF(COUNT(*), 0)::float8) * 100, 0) AS success_rate,
                    COALESCE(AVG(duration_seconds)::float8 / 60.0, 0) AS avg_duration_mins
             FROM pipeline_metrics
             WHERE project_id = $1
               AND created_at >= $2",
        )
        .bind(project_id)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!(%project_id, %time_range, total_runs = row.total_runs, "metrics query");
        Ok(PipelineMetrics {
            total_runs: row.total_runs,
            successful_runs: row.successful_runs,
            failed_runs: row.failed_runs,
            success_rate: row.success_rate,
            avg_duration_mins: row.avg_duration_mins,
        })
    }
}
