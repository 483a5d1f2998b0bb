//! Scripted warehouse mock for tests.
//!
//! Defaults hand back a healthy project (100 runs, 85% success, 12 min
//! average) so dispatcher tests only script the slots they care about.

use async_trait::async_trait;
use std::sync::Mutex;

use drover_protocol::analytics::{DurationStats, FailurePattern, PipelineMetrics, TrendWeek};

use crate::WarehouseClient;
use crate::error::{WarehouseError, WarehouseResult};

/// Scripted warehouse client.
pub struct MockWarehouse {
    duration_result: Mutex<Option<WarehouseResult<Option<DurationStats>>>>,
    patterns_result: Mutex<Option<WarehouseResult<Vec<FailurePattern>>>>,
    trends_result: Mutex<Option<WarehouseResult<Vec<TrendWeek>>>>,
    metrics_result: Mutex<Option<WarehouseResult<PipelineMetrics>>>,
    duration_calls: Mutex<Vec<(String, String, i32)>>,
    patterns_calls: Mutex<Vec<String>>,
    trends_calls: Mutex<Vec<String>>,
    metrics_calls: Mutex<Vec<(String, String)>>,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self {
            duration_result: Mutex::new(None),
            patterns_result: Mutex::new(None),
            trends_result: Mutex::new(None),
            metrics_result: Mutex::new(None),
            duration_calls: Mutex::new(Vec::new()),
            patterns_calls: Mutex::new(Vec::new()),
            trends_calls: Mutex::new(Vec::new()),
            metrics_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_average_duration(&self, result: WarehouseResult<Option<DurationStats>>) {
        *self.duration_result.lock().unwrap() = Some(result);
    }

    pub fn set_failure_patterns(&self, result: WarehouseResult<Vec<FailurePattern>>) {
        *self.patterns_result.lock().unwrap() = Some(result);
    }

    pub fn set_trends(&self, result: WarehouseResult<Vec<TrendWeek>>) {
        *self.trends_result.lock().unwrap() = Some(result);
    }

    pub fn set_metrics(&self, result: WarehouseResult<PipelineMetrics>) {
        *self.metrics_result.lock().unwrap() = Some(result);
    }

    pub fn duration_calls(&self) -> Vec<(String, String, i32)> {
        self.duration_calls.lock().unwrap().clone()
    }

    pub fn patterns_calls(&self) -> Vec<String> {
        self.patterns_calls.lock().unwrap().clone()
    }

    pub fn trends_calls(&self) -> Vec<String> {
        self.trends_calls.lock().unwrap().clone()
    }

    pub fn metrics_calls(&self) -> Vec<(String, String)> {
        self.metrics_calls.lock().unwrap().clone()
    }
}

impl Default for MockWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

/// Clone a scripted result. `WarehouseError` is not `Clone`, so scripted
/// errors are replayed as protocol-level query errors with the original
/// text.
fn replay<T: Clone>(slot: &Mutex<Option<WarehouseResult<T>>>) -> Option<WarehouseResult<T>> {
    slot.lock().unwrap().as_ref().map(|r| match r {
        Ok(v) => Ok(v.clone()),
        Err(e) => Err(WarehouseError::Query(sqlx::Error::Protocol(e.to_string()))),
    })
}

#[async_trait]
impl WarehouseClient for MockWarehouse {
    async fn get_average_duration(
        &self,
        project_id: &str,
        ref_name: &str,
        last_n_days: i32,
    ) -> WarehouseResult<Option<DurationStats>> {
        self.duration_calls.lock().unwrap().push((
            project_id.to_string(),
            ref_name.to_string(),
            last_n_days,
        ));
        replay(&self.duration_result).unwrap_or(Ok(Some(DurationStats {
            avg_duration_secs: 720.0,
            sample_size: 20,
            stddev_duration: Some(60.0),
        })))
    }

    async fn get_failure_patterns(
        &self,
        project_id: &str,
    ) -> WarehouseResult<Vec<FailurePattern>> {
        self.patterns_calls.lock().unwrap().push(project_id.to_string());
        replay(&self.patterns_result).unwrap_or(Ok(Vec::new()))
    }

    async fn get_pipeline_trends(&self, project_id: &str) -> WarehouseResult<Vec<TrendWeek>> {
        self.trends_calls.lock().unwrap().push(project_id.to_string());
        replay(&self.trends_result).unwrap_or(Ok(Vec::new()))
    }

    async fn get_pipeline_metrics(
        &self,
        project_id: &str,
        time_range: &str,
    ) -> WarehouseResult<PipelineMetrics> {
        self.metrics_calls
            .lock()
            .unwrap()
            .push((project_id.to_string(), time_range.to_string()));
        replay(&self.metrics_result).unwrap_or(Ok(PipelineMetrics {
            total_runs: 100,
            successful_runs: 85,
            failed_runs: 15,
            success_rate: 85.0,
            avg_duration_mins: 12.0,
        }))
    }
}
