//! Storage engine abstraction.

use async_trait::async_trait;

use crate::pipeline::{Collection, Document, Filter, Stage};

/// Executes declarative pipelines against a document collection.
///
/// The DuckDB store implements this for the server; tests can swap in
/// canned or failing executors without touching the dashboard logic.
#[async_trait]
pub trait AggregationExecutor: Send + Sync + 'static {
    /// Number of documents in `collection`, optionally restricted by `filter`.
    async fn count_documents(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> anyhow::Result<u64>;

    /// Run `stages` against `collection`. Result order carries no meaning
    /// beyond what the stages impose, and the sequence may be empty.
    async fn aggregate(
        &self,
        collection: Collection,
        stages: &[Stage],
    ) -> anyhow::Result<Vec<Document>>;
}
