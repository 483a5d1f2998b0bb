//! Analytics warehouse collaborator boundary.
//!
//! Aggregate queries over the synced `pipeline_metrics` table. The core
//! depends only on the [`WarehouseClient`] trait; [`PgWarehouse`] is the
//! PostgreSQL implementation and [`MockWarehouse`] the scripted test
//! double.

pub mod error;
pub mod mock;
pub mod pg;

use async_trait::async_trait;

use drover_protocol::analytics::{DurationStats, FailurePattern, PipelineMetrics, TrendWeek};

use crate::error::WarehouseResult;

/// Aggregate queries the companion needs from the warehouse.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Mean successful-pipeline duration for a project/ref over the last
    /// `last_n_days`. `None` when there is no history at all.
    async fn get_average_duration(
        &self,
        project_id: &str,
        ref_name: &str,
        last_n_days: i32,
    ) -> WarehouseResult<Option<DurationStats>>;

    /// Failure rates bucketed by hour-of-day/day-of-week (30-day window,
    /// buckets with more than 5 runs only), worst first.
    async fn get_failure_patterns(&self, project_id: &str)
    -> WarehouseResult<Vec<FailurePattern>>;

    /// Weekly trend rows for the last 12 weeks, most recent first, with
    /// lag columns for week-over-week comparison.
    async fn get_pipeline_trends(&self, project_id: &str) -> WarehouseResult<Vec<TrendWeek>>;

    /// Aggregate metrics for a reporting window (`last_7_days`,
    /// `last_30_days`, `today`).
    async fn get_pipeline_metrics(
        &self,
        project_id: &str,
        time_range: &str,
    ) -> WarehouseResult<PipelineMetrics>;
}

pub use error::WarehouseError;
pub use mock::MockWarehouse;
pub use pg::PgWarehouse;
