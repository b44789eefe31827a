use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use shopdash_core::executor::AggregationExecutor;
use shopdash_core::pipeline::Collection;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Ok,
    Unavailable,
}

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub version: &'static str,
    pub store: &'static str,
    /// Document count per collection; empty when the store is unreachable.
    pub documents: BTreeMap<&'static str, u64>,
}

async fn document_counts(state: &AppState) -> anyhow::Result<BTreeMap<&'static str, u64>> {
    state.db.ping().await?;
    let mut counts = BTreeMap::new();
    for collection in Collection::ALL {
        let count = state.db.count_documents(collection, None).await?;
        counts.insert(collection.as_str(), count);
    }
    Ok(counts)
}

/// `GET /health` - store reachability plus per-collection document counts.
///
/// `200` with `status: "ok"` when every collection can be counted,
/// `503` with `status: "unavailable"` otherwise.
#[tracing::instrument(skip(state))]
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (code, status, documents) = match document_counts(&state).await {
        Ok(counts) => (StatusCode::OK, HealthStatus::Ok, counts),
        Err(e) => {
            tracing::error!(error = %e, "Health check: store unreachable");
            (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Unavailable, BTreeMap::new())
        }
    };

    let report = HealthReport {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store: "duckdb",
        documents,
    };
    (code, Json(report))
}
