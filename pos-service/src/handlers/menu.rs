use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

use crate::dtos::menu::{
    CreateMenuItemRequest, DeletedMenuQuery, MenuItemResponse, UpdateMenuItemRequest,
};
use crate::models::MenuItem;
use crate::services::MenuListing;
use crate::utils::{DayFilter, ValidatedJson};
use crate::AppState;

fn parse_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw)
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Invalid menu item id: {}", raw)))
}

fn not_found() -> AppError {
    AppError::NotFound(anyhow::anyhow!("Menu item not found"))
}

fn respond(items: Vec<MenuItem>) -> Json<Vec<MenuItemResponse>> {
    Json(items.into_iter().map(MenuItemResponse::from).collect())
}

/// Items shown on the billing screen.
#[tracing::instrument(skip(state))]
pub async fn list_available(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItemResponse>>, AppError> {
    let items = state.store.list_menu_items(MenuListing::Available).await?;
    Ok(respond(items))
}

#[tracing::instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
) -> Result<Json<Vec<MenuItemResponse>>, AppError> {
    let items = state.store.list_menu_items(MenuListing::Active).await?;
    Ok(respond(items))
}

#[tracing::instrument(skip(state))]
pub async fn list_deleted(
    State(state): State<AppState>,
    Query(query): Query<DeletedMenuQuery>,
) -> Result<Json<Vec<MenuItemResponse>>, AppError> {
    let start = query.start_date.as_deref();
    let end = query.end_date.as_deref();

    let range = match query.date_filter.as_deref().filter(|f| !f.trim().is_empty()) {
        Some(filter) => filter.parse::<DayFilter>()?.resolve(&state.clock, start, end)?,
        None => state.clock.optional_range(start, end)?,
    };

    let items = state
        .store
        .list_menu_items(MenuListing::Deleted(range))
        .await?;
    Ok(respond(items))
}

#[tracing::instrument(skip(state))]
pub async fn find_by_barcode(
    State(state): State<AppState>,
    Path(barcode): Path<String>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let item = state
        .store
        .find_menu_item_by_barcode(barcode.trim())
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(MenuItemResponse::from(item)))
}

#[tracing::instrument(skip(state, req), fields(name = %req.name))]
pub async fn create_item(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateMenuItemRequest>,
) -> Result<impl IntoResponse, AppError> {
    let item = state.store.insert_menu_item(MenuItem::from(req)).await?;
    tracing::info!(item_id = ?item.id, "Menu item created");
    Ok((StatusCode::CREATED, Json(MenuItemResponse::from(item))))
}

#[tracing::instrument(skip(state, req))]
pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateMenuItemRequest>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let id = parse_id(&id)?;
    let patch = req.into_patch()?;
    let item = state
        .store
        .update_menu_item(id, &patch)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(MenuItemResponse::from(item)))
}

#[tracing::instrument(skip(state))]
pub async fn toggle_availability(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let id = parse_id(&id)?;
    let item = state
        .store
        .toggle_menu_item_availability(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(MenuItemResponse::from(item)))
}

#[tracing::instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let id = parse_id(&id)?;
    let item = state
        .store
        .set_menu_item_deleted(id, Some(Utc::now()))
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(MenuItemResponse::from(item)))
}

#[tracing::instrument(skip(state))]
pub async fn restore_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MenuItemResponse>, AppError> {
    let id = parse_id(&id)?;
    let item = state
        .store
        .set_menu_item_deleted(id, None)
        .await?
        .ok_or_else(not_found)?;
    Ok(Json(MenuItemResponse::from(item)))
}
