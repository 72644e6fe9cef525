use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

/// Payment mode recorded on an archived bill that never carried one.
pub const DEFAULT_PAYMENT_MODE: &str = "Cash";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub name: String,
    pub quantity: i32,
    #[serde(rename = "price")]
    pub unit_price: Decimal,
    #[serde(rename = "total")]
    pub line_total: Decimal,
}

impl LineItem {
    /// Builds a line, deriving the line total from quantity and unit price
    /// when the caller did not send one.
    pub fn new(
        name: String,
        quantity: i32,
        unit_price: Decimal,
        line_total: Option<Decimal>,
    ) -> Result<Self, AppError> {
        let line_total = match line_total {
            Some(total) => total,
            None => unit_price
                .checked_mul(Decimal::from(quantity))
                .ok_or_else(|| {
                    AppError::BadRequest(anyhow::anyhow!(
                        "Line total for {} is out of range",
                        name
                    ))
                })?,
        };
        Ok(Self {
            name,
            quantity,
            unit_price,
            line_total,
        })
    }
}

/// An active bill. `id` comes from the bill sequence and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    #[serde(rename = "_id")]
    pub id: i64,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_mode: Option<String>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn new(id: i64, items: Vec<LineItem>, total: Decimal, payment_mode: Option<String>) -> Self {
        Self {
            id,
            items,
            total,
            payment_mode,
            created_at: Utc::now(),
        }
    }

    /// Archive record for this bill, keeping its id and creation time.
    pub fn into_deleted(self, deleted_at: DateTime<Utc>) -> DeletedBill {
        DeletedBill {
            id: self.id,
            items: self.items,
            total: self.total,
            payment_mode: self
                .payment_mode
                .filter(|mode| !mode.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_PAYMENT_MODE.to_string()),
            created_at: self.created_at,
            deleted_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedBill {
    #[serde(rename = "_id")]
    pub id: i64,
    pub items: Vec<LineItem>,
    pub total: Decimal,
    pub payment_mode: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub deleted_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tea() -> LineItem {
        LineItem::new("Tea".to_string(), 2, Decimal::from(10), None).unwrap()
    }

    #[test]
    fn line_total_defaults_to_quantity_times_price() {
        assert_eq!(tea().line_total, Decimal::from(20));

        let explicit =
            LineItem::new("Tea".to_string(), 2, Decimal::from(10), Some(Decimal::from(18))).unwrap();
        assert_eq!(explicit.line_total, Decimal::from(18));
    }

    #[test]
    fn line_total_overflow_is_a_bad_request() {
        let price = Decimal::from_str_exact("10000000000000000000000000000").unwrap();
        let err = LineItem::new("Tea".to_string(), 10, price, None).unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(err.to_string(), "Bad request: Line total for Tea is out of range");
    }

    #[test]
    fn archive_defaults_payment_mode_to_cash() {
        let bill = Bill::new(1_000_000_001, vec![tea()], Decimal::from(20), None);
        let created_at = bill.created_at;
        let deleted = bill.into_deleted(Utc::now());

        assert_eq!(deleted.id, 1_000_000_001);
        assert_eq!(deleted.payment_mode, "Cash");
        assert_eq!(deleted.created_at, created_at);
    }

    #[test]
    fn archive_keeps_existing_payment_mode() {
        let bill = Bill::new(7, vec![tea()], Decimal::from(20), Some("UPI".to_string()));
        assert_eq!(bill.into_deleted(Utc::now()).payment_mode, "UPI");
    }

    #[test]
    fn bson_round_trip_uses_bill_id_as_document_id() {
        let bill = Bill::new(42, vec![tea()], Decimal::from(20), None);
        let doc = mongodb::bson::to_document(&bill).unwrap();

        assert_eq!(doc.get_i64("_id").unwrap(), 42);
        assert!(doc.get_datetime("createdAt").is_ok());
        assert!(!doc.contains_key("paymentMode"));
    }
}
