use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::shop::{CreateCustomerRequest, CustomerResponse, UpdateUserDetailsRequest};
use crate::models::{Customer, UserDetails};
use crate::services::UserDetailsPatch;
use crate::utils::ValidatedJson;
use crate::AppState;

#[tracing::instrument(skip(state))]
pub async fn get_user_details(
    State(state): State<AppState>,
) -> Result<Json<UserDetails>, AppError> {
    Ok(Json(state.store.user_details().await?))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_user_details(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<UpdateUserDetailsRequest>,
) -> Result<Json<UserDetails>, AppError> {
    let details = state
        .store
        .update_user_details(&UserDetailsPatch::from(req))
        .await?;
    tracing::info!("Shop profile updated");
    Ok(Json(details))
}

#[tracing::instrument(skip(state))]
pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<CustomerResponse>>, AppError> {
    let customers = state.store.list_customers().await?;
    Ok(Json(customers.into_iter().map(CustomerResponse::from).collect()))
}

#[tracing::instrument(skip(state, req))]
pub async fn create_customer(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateCustomerRequest>,
) -> Result<impl IntoResponse, AppError> {
    let customer = Customer::new(req.name.trim().to_string(), req.phone.trim().to_string());
    let customer = state.store.insert_customer(customer).await?;
    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}

#[tracing::instrument(skip(state))]
pub async fn find_customer_by_phone(
    State(state): State<AppState>,
    Path(phone): Path<String>,
) -> Result<Json<CustomerResponse>, AppError> {
    let customer = state
        .store
        .find_customer_by_phone(phone.trim())
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;
    Ok(Json(CustomerResponse::from(customer)))
}
