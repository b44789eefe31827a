use anyhow::Context;
use async_trait::async_trait;

use shopdash_core::executor::AggregationExecutor;
use shopdash_core::pipeline::{Collection, Document, Filter, Stage};

use crate::queries::pipeline::{compile, compile_count};
use crate::DuckDbBackend;

#[async_trait]
impl AggregationExecutor for DuckDbBackend {
    async fn count_documents(
        &self,
        collection: Collection,
        filter: Option<&Filter>,
    ) -> anyhow::Result<u64> {
        let query = compile_count(collection, filter);
        let conn = self.conn.lock().await;
        let count: i64 = conn
            .prepare(&query.sql)?
            .query_row(duckdb::params_from_iter(query.params.iter()), |row| {
                row.get(0)
            })?;
        Ok(count.max(0) as u64)
    }

    async fn aggregate(
        &self,
        collection: Collection,
        stages: &[Stage],
    ) -> anyhow::Result<Vec<Document>> {
        let query = compile(collection, stages);
        let raw: Vec<String> = {
            let conn = self.conn.lock().await;
            let mut stmt = conn
                .prepare(&query.sql)
                .with_context(|| format!("preparing pipeline over {}", collection.as_str()))?;
            let rows = stmt.query_map(duckdb::params_from_iter(query.params.iter()), |row| {
                row.get::<_, String>(0)
            })?;
            let raw = rows.collect::<Result<Vec<_>, _>>()?;
            raw
        };

        tracing::debug!(
            collection = collection.as_str(),
            stages = stages.len(),
            returned = raw.len(),
            "aggregation finished"
        );

        raw.iter()
            .map(|body| {
                serde_json::from_str::<Document>(body)
                    .with_context(|| format!("pipeline over {} returned a non-object", collection.as_str()))
            })
            .collect()
    }
}
