use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use validator::Validate;

use super::non_negative;
use crate::models::{Bill, DeletedBill, LineItem};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillRequest {
    #[validate(length(min = 1, message = "A bill needs at least one item"), nested)]
    pub items: Vec<LineItemRequest>,

    pub total: Decimal,

    #[serde(default)]
    pub payment_mode: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LineItemRequest {
    #[validate(length(min = 1, message = "Item name is required"))]
    pub name: String,

    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,

    #[validate(custom(function = "non_negative"))]
    pub price: Decimal,

    #[serde(default)]
    pub total: Option<Decimal>,
}

impl TryFrom<LineItemRequest> for LineItem {
    type Error = AppError;

    fn try_from(req: LineItemRequest) -> Result<Self, Self::Error> {
        LineItem::new(req.name, req.quantity, req.price, req.total)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillResponse {
    pub id: i64,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Bill> for BillResponse {
    fn from(bill: Bill) -> Self {
        Self {
            id: bill.id,
            items: bill.items,
            total: bill.total,
            payment_mode: bill.payment_mode,
            created_at: bill.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedBillResponse {
    pub id: i64,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub payment_mode: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: DateTime<Utc>,
}

impl From<DeletedBill> for DeletedBillResponse {
    fn from(bill: DeletedBill) -> Self {
        Self {
            id: bill.id,
            items: bill.items,
            total: bill.total,
            payment_mode: bill.payment_mode,
            created_at: bill.created_at,
            deleted_at: bill.deleted_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearBillsResponse {
    pub message: String,
    pub deleted_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_items_fail_validation() {
        let req: CreateBillRequest = serde_json::from_value(json!({"items": [], "total": 0})).unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("items"));
    }

    #[test]
    fn nested_line_items_are_validated() {
        let req: CreateBillRequest = serde_json::from_value(json!({
            "items": [{"name": "Tea", "quantity": 0, "price": -1}],
            "total": 0
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn non_numeric_total_does_not_deserialize() {
        let result = serde_json::from_value::<CreateBillRequest>(json!({
            "items": [{"name": "Tea", "quantity": 1, "price": 10}],
            "total": "twenty"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn response_uses_wire_names() {
        let bill = Bill::new(
            1_000_000_001,
            vec![LineItem::new("Tea".to_string(), 2, Decimal::from(10), None).unwrap()],
            Decimal::from(20),
            None,
        );
        let body = serde_json::to_value(BillResponse::from(bill)).unwrap();

        assert_eq!(body["id"], 1_000_000_001_i64);
        assert_eq!(body["items"][0]["price"].as_f64(), Some(10.0));
        assert_eq!(body["items"][0]["total"].as_f64(), Some(20.0));
        assert!(body["createdAt"].is_string());
        assert!(body.get("paymentMode").is_none());
    }
}
