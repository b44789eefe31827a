use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A count or aggregation call against the storage engine failed.
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    /// A fragment builder was handed a value it does not support.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An aggregation result did not have the shape its pipeline produces.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
