use thiserror::Error;

/// Errors from the warehouse collaborator.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("warehouse query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("unsupported time range: {0}")]
    BadTimeRange(String),
}

pub type WarehouseResult<T> = Result<T, WarehouseError>;
