use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::opt_chrono_datetime_as_bson_datetime;

/// A dish on the menu. Deleting only flags the record; `barcode`, when
/// present, is unique across every item including deleted ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub category: String,
    pub name: String,
    pub price: Decimal,
    pub is_veg: bool,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub deleted_at: Option<DateTime<Utc>>,
    // Never serialized as null: the unique index only covers string values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode: Option<String>,
}

fn default_true() -> bool {
    true
}

impl MenuItem {
    pub fn new(
        category: String,
        name: String,
        price: Decimal,
        is_veg: bool,
        is_available: Option<bool>,
        barcode: Option<String>,
    ) -> Self {
        Self {
            id: None,
            category,
            name,
            price,
            is_veg,
            is_available: is_available.unwrap_or(true),
            is_deleted: false,
            deleted_at: None,
            barcode: normalize_barcode(barcode),
        }
    }

    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
    }

    pub fn restore(&mut self) {
        self.is_deleted = false;
        self.deleted_at = None;
    }

    /// Visible on the billing screen.
    pub fn is_listed(&self) -> bool {
        self.is_available && !self.is_deleted
    }
}

/// Blank barcodes are treated as "no barcode".
pub fn normalize_barcode(barcode: Option<String>) -> Option<String> {
    barcode
        .map(|b| b.trim().to_string())
        .filter(|b| !b.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idly() -> MenuItem {
        MenuItem::new(
            "Tiffin".to_string(),
            "Idly".to_string(),
            Decimal::from(30),
            true,
            None,
            Some("  ".to_string()),
        )
    }

    #[test]
    fn new_item_defaults() {
        let item = idly();
        assert!(item.is_available);
        assert!(!item.is_deleted);
        assert_eq!(item.barcode, None);
        assert!(item.is_listed());
    }

    #[test]
    fn delete_and_restore_flip_visibility() {
        let mut item = idly();
        item.mark_deleted(Utc::now());
        assert!(item.is_deleted);
        assert!(item.deleted_at.is_some());
        assert!(!item.is_listed());

        item.restore();
        assert!(!item.is_deleted);
        assert_eq!(item.deleted_at, None);
        assert!(item.is_listed());
    }

    #[test]
    fn absent_barcode_is_not_serialized() {
        let doc = mongodb::bson::to_document(&idly()).unwrap();
        assert!(!doc.contains_key("barcode"));
        assert!(!doc.contains_key("_id"));
        assert!(doc.get_bool("isVeg").unwrap());
    }
}
