use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use super::non_negative;
use crate::models::{menu_item::normalize_barcode, MenuItem};
use crate::services::MenuItemPatch;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMenuItemRequest {
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,

    pub is_veg: bool,

    #[serde(default)]
    pub is_available: Option<bool>,

    #[serde(default)]
    pub barcode: Option<String>,
}

impl From<CreateMenuItemRequest> for MenuItem {
    fn from(req: CreateMenuItemRequest) -> Self {
        MenuItem::new(
            req.category,
            req.name,
            req.price,
            req.is_veg,
            req.is_available,
            req.barcode,
        )
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMenuItemRequest {
    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: Option<String>,

    #[validate(length(min = 1, message = "Name must not be empty"))]
    pub name: Option<String>,

    pub price: Option<Decimal>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
    pub barcode: Option<String>,
}

impl UpdateMenuItemRequest {
    pub fn into_patch(self) -> Result<MenuItemPatch, AppError> {
        if let Some(price) = self.price {
            non_negative(&price).map_err(|_| {
                AppError::BadRequest(anyhow::anyhow!("Price must not be negative"))
            })?;
        }
        Ok(MenuItemPatch {
            category: self.category,
            name: self.name,
            price: self.price,
            is_veg: self.is_veg,
            is_available: self.is_available,
            barcode: normalize_barcode(self.barcode),
        })
    }
}

/// `GET /menu-items/deleted` query.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedMenuQuery {
    pub date_filter: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItemResponse {
    pub id: String,
    pub category: String,
    pub name: String,
    pub price: Decimal,
    pub is_veg: bool,
    pub is_available: bool,
    pub is_deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

impl From<MenuItem> for MenuItemResponse {
    fn from(item: MenuItem) -> Self {
        Self {
            id: item.id.map(|id| id.to_hex()).unwrap_or_default(),
            category: item.category,
            name: item.name,
            price: item.price,
            is_veg: item.is_veg,
            is_available: item.is_available,
            is_deleted: item.is_deleted,
            deleted_at: item.deleted_at,
            barcode: item.barcode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_defaults_availability() {
        let req: CreateMenuItemRequest = serde_json::from_value(json!({
            "category": "Tiffin", "name": "Idly", "price": 30, "isVeg": true
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let item = MenuItem::from(req);
        assert!(item.is_available);
        assert!(!item.is_deleted);
        assert_eq!(item.barcode, None);
    }

    #[test]
    fn update_request_keeps_absent_fields_absent() {
        let req: UpdateMenuItemRequest =
            serde_json::from_value(json!({"price": 35, "barcode": ""})).unwrap();
        let patch = req.into_patch().unwrap();

        assert_eq!(patch.price, Some(Decimal::from(35)));
        assert_eq!(patch.name, None);
        assert_eq!(patch.barcode, None);
    }

    #[test]
    fn negative_price_update_is_rejected() {
        let req = UpdateMenuItemRequest {
            price: Some(Decimal::from(-5)),
            ..Default::default()
        };
        assert!(matches!(req.into_patch(), Err(AppError::BadRequest(_))));
    }
}
