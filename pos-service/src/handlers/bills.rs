use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::bills::{BillResponse, ClearBillsResponse, CreateBillRequest, DeletedBillResponse};
use crate::dtos::{MessageResponse, RangeQuery};
use crate::middleware::AuthUser;
use crate::models::LineItem;
use crate::services::{bills, Receipt};
use crate::utils::ValidatedJson;
use crate::AppState;

#[tracing::instrument(skip(state, query))]
pub async fn list_bills(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<BillResponse>>, AppError> {
    let range = state
        .clock
        .optional_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let bills = state.store.list_bills(range).await?;
    Ok(Json(bills.into_iter().map(BillResponse::from).collect()))
}

#[tracing::instrument(skip(state, req), fields(items = req.items.len()))]
pub async fn create_bill(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateBillRequest>,
) -> Result<impl IntoResponse, AppError> {
    let items = req
        .items
        .into_iter()
        .map(LineItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let payment_mode = req.payment_mode.filter(|mode| !mode.trim().is_empty());

    let bill = bills::create_bill(state.store.as_ref(), items, req.total, payment_mode).await?;
    Ok((StatusCode::CREATED, Json(BillResponse::from(bill))))
}

#[tracing::instrument(skip(state))]
pub async fn get_bill(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<BillResponse>, AppError> {
    let bill = state
        .store
        .find_bill(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill not found")))?;
    Ok(Json(BillResponse::from(bill)))
}

#[tracing::instrument(skip(state))]
pub async fn bill_receipt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let bill = state
        .store
        .find_bill(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill not found")))?;
    let shop = state.store.user_details().await?;

    let text = Receipt {
        shop: &shop,
        bill: &bill,
        clock: &state.clock,
    }
    .to_string();

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text))
}

#[tracing::instrument(skip(state))]
pub async fn delete_bill(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    bills::archive_bill(state.store.as_ref(), id).await?;
    Ok(Json(MessageResponse::new("Bill deleted successfully")))
}

#[tracing::instrument(skip(state, user))]
pub async fn clear_bills(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ClearBillsResponse>, AppError> {
    let deleted_count = state.store.clear_bills().await?;
    tracing::warn!(user = %user.0.sub, deleted_count, "All active bills cleared");

    Ok(Json(ClearBillsResponse {
        message: "All bills cleared".to_string(),
        deleted_count,
    }))
}

#[tracing::instrument(skip(state))]
pub async fn last_bill(State(state): State<AppState>) -> Result<Json<BillResponse>, AppError> {
    let bill = state
        .store
        .latest_bill()
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No bills found")))?;
    Ok(Json(BillResponse::from(bill)))
}

#[tracing::instrument(skip(state, query))]
pub async fn list_deleted_bills(
    State(state): State<AppState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<DeletedBillResponse>>, AppError> {
    let range = state
        .clock
        .optional_range(query.start_date.as_deref(), query.end_date.as_deref())?;
    let bills = state.store.list_deleted_bills(range).await?;
    Ok(Json(bills.into_iter().map(DeletedBillResponse::from).collect()))
}
