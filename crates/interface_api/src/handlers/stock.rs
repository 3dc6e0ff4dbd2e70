//! Stock handlers

use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;

use crate::dto::stock::{LowStockQuery, ProductStockResponse};
use crate::{error::ApiError, AppState};

/// Lists products running low, lowest stock first
pub async fn low_stock(
    State(state): State<AppState>,
    query: Result<Query<LowStockQuery>, QueryRejection>,
) -> Result<Json<Vec<ProductStockResponse>>, ApiError> {
    let Query(query) = query?;
    let threshold = query.threshold.unwrap_or(state.config.low_stock_threshold);

    let products = state.billing.low_stock(threshold).await?;
    Ok(Json(products.into_iter().map(Into::into).collect()))
}
