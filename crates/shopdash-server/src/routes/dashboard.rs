use std::sync::Arc;

use axum::{extract::State, response::IntoResponse, Json};

use crate::{error::AppError, state::AppState};

/// `GET /api/dashboard/totals` - All-time counts, sums and the
/// user-to-customer rate.
#[tracing::instrument(skip(state))]
pub async fn totals(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let totals = state.dashboard.totals().await?;
    Ok(Json(totals))
}

/// `GET /api/dashboard/last-30-days` - `[previous, current]` pairs for the
/// last 30 days against the 30 days before them.
#[tracing::instrument(skip(state))]
pub async fn last_30_days(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let comparison = state.dashboard.last_30_days().await?;
    Ok(Json(comparison))
}

/// `GET /api/dashboard/charts` - Gap-filled daily series plus the category
/// breakdown for the last 30 days.
#[tracing::instrument(skip(state))]
pub async fn charts(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let charts = state.dashboard.charts().await?;
    Ok(Json(charts))
}
