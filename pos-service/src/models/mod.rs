pub mod bill;
pub mod menu_item;
pub mod shop;

pub use bill::{Bill, DeletedBill, LineItem, DEFAULT_PAYMENT_MODE};
pub use menu_item::MenuItem;
pub use shop::{Customer, UserDetails};

/// Collection names, shared by the MongoDB store and the storage estimate.
pub mod collections {
    pub const BILLS: &str = "bills";
    pub const DELETED_BILLS: &str = "deletedBills";
    pub const MENU_ITEMS: &str = "menuItems";
    pub const COUNTERS: &str = "counters";
    pub const CUSTOMERS: &str = "customers";
    pub const USER_DETAILS: &str = "userDetails";

    pub const ALL: [&str; 6] = [
        BILLS,
        DELETED_BILLS,
        MENU_ITEMS,
        COUNTERS,
        CUSTOMERS,
        USER_DETAILS,
    ];
}

// Helper module for optional DateTime<Utc> as BSON DateTime
pub(crate) mod opt_chrono_datetime_as_bson_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(dt) => {
                let bson_dt = bson::DateTime::from_chrono(*dt);
                bson_dt.serialize(serializer)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let opt: Option<bson::DateTime> = Option::deserialize(deserializer)?;
        Ok(opt.map(|dt| dt.to_chrono()))
    }
}
