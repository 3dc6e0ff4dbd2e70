//! Bill handlers

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use core_kernel::BillId;

use crate::dto::bills::*;
use crate::{error::ApiError, AppState};

/// Lists bills, newest first
pub async fn list_bills(State(state): State<AppState>) -> Result<Json<Vec<BillResponse>>, ApiError> {
    let bills = state.billing.list_bills().await?;
    Ok(Json(bills.into_iter().map(Into::into).collect()))
}

/// Gets a bill with its lines
pub async fn get_bill(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<BillDetailResponse>, ApiError> {
    let Path(id) = id?;
    let detail = state.billing.get_bill(BillId::from(id)).await?;
    Ok(Json(detail.into()))
}

/// Creates a bill and decrements stock
#[instrument(skip_all)]
pub async fn create_bill(
    State(state): State<AppState>,
    body: Result<Json<CreateBillBody>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedBillResponse>), ApiError> {
    let Json(body) = body?;
    body.validate()?;

    let created = state.billing.create_bill(body.into_request()?).await?;
    info!(bill_number = %created.bill_number, "Bill created via API");

    Ok((StatusCode::CREATED, Json(created.into())))
}

/// Deletes a bill and restores its stock
#[instrument(skip_all)]
pub async fn delete_bill(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DeletedBillResponse>, ApiError> {
    let Path(id) = id?;
    let deleted = state.billing.delete_bill(BillId::from(id)).await?;
    Ok(Json(deleted.into()))
}
