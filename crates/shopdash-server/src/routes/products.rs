use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use shopdash_core::pipeline::Granularity;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ChartQuery {
    pub granularity: Option<String>,
}

/// `GET /api/products/chart` - Revenue and units per category over every
/// order. `granularity` is `monthly` (default) or `daily`.
#[tracing::instrument(skip(state))]
pub async fn chart(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChartQuery>,
) -> Result<impl IntoResponse, AppError> {
    let granularity = match query.granularity.as_deref() {
        Some(raw) => Granularity::parse(raw)?,
        None => Granularity::default(),
    };
    let breakdown = state.dashboard.category_chart(granularity).await?;
    Ok(Json(breakdown))
}
