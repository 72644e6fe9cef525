//! Storage seam for the POS service.
//!
//! Every cross-request invariant (unique bill ids, barcode uniqueness, the
//! active/archived split) is enforced by the store implementation, never by
//! in-process state held by handlers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use rust_decimal::Decimal;
use service_core::error::AppError;

use crate::models::{Bill, Customer, DeletedBill, MenuItem, UserDetails};
use crate::utils::DateRange;

/// Counter document name for bill numbers.
pub const BILL_SEQUENCE: &str = "billId";

/// Stored value of a freshly created bill counter; the first bill gets
/// `BILL_SEQUENCE_START + 1`.
pub const BILL_SEQUENCE_START: i64 = 1_000_000_000;

#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Creates the counter at `start` if it does not exist yet. Upsert, so
    /// concurrent callers cannot create two counters.
    async fn ensure_sequence(&self, name: &str, start: i64) -> Result<(), AppError>;

    /// Atomically increments the counter and returns the new value, creating
    /// it at `start` first when missing.
    async fn next_sequence(&self, name: &str, start: i64) -> Result<i64, AppError>;
}

#[async_trait]
pub trait BillStore: Send + Sync {
    async fn insert_bill(&self, bill: &Bill) -> Result<(), AppError>;

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>, AppError>;

    /// Active bills, newest first.
    async fn list_bills(&self, range: Option<DateRange>) -> Result<Vec<Bill>, AppError>;

    async fn latest_bill(&self) -> Result<Option<Bill>, AppError>;

    /// Stores the archive record unless one with the same id already exists.
    async fn archive_bill(&self, deleted: &DeletedBill) -> Result<(), AppError>;

    /// Removes an active bill; `false` when it was not there.
    async fn remove_bill(&self, id: i64) -> Result<bool, AppError>;

    /// Removes every active bill without archiving. Returns the count.
    async fn clear_bills(&self) -> Result<u64, AppError>;

    /// Archived bills, most recently deleted first.
    async fn list_deleted_bills(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<DeletedBill>, AppError>;
}

/// Which slice of the menu a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuListing {
    /// Available and not deleted: what the billing screen shows.
    Available,
    /// Everything not deleted, available or not.
    Active,
    /// Soft-deleted items, optionally restricted by `deletedAt`.
    Deleted(Option<DateRange>),
}

impl MenuListing {
    pub fn matches(&self, item: &MenuItem) -> bool {
        match self {
            MenuListing::Available => item.is_listed(),
            MenuListing::Active => !item.is_deleted,
            MenuListing::Deleted(range) => {
                item.is_deleted
                    && match (range, item.deleted_at) {
                        (None, _) => true,
                        (Some(range), Some(at)) => range.contains(at),
                        (Some(_), None) => false,
                    }
            }
        }
    }
}

/// Partial menu update; `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuItemPatch {
    pub category: Option<String>,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub is_veg: Option<bool>,
    pub is_available: Option<bool>,
    pub barcode: Option<String>,
}

impl MenuItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &MenuItemPatch::default()
    }

    pub fn apply(&self, item: &mut MenuItem) {
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(is_veg) = self.is_veg {
            item.is_veg = is_veg;
        }
        if let Some(is_available) = self.is_available {
            item.is_available = is_available;
        }
        if let Some(barcode) = &self.barcode {
            item.barcode = Some(barcode.clone());
        }
    }
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    /// Inserts and returns the item with its id. A barcode already used by
    /// any other item, deleted or not, yields `AppError::Conflict`.
    async fn insert_menu_item(&self, item: MenuItem) -> Result<MenuItem, AppError>;

    async fn find_menu_item(&self, id: ObjectId) -> Result<Option<MenuItem>, AppError>;

    async fn find_menu_item_by_barcode(&self, barcode: &str)
        -> Result<Option<MenuItem>, AppError>;

    async fn list_menu_items(&self, listing: MenuListing) -> Result<Vec<MenuItem>, AppError>;

    async fn update_menu_item(
        &self,
        id: ObjectId,
        patch: &MenuItemPatch,
    ) -> Result<Option<MenuItem>, AppError>;

    async fn toggle_menu_item_availability(
        &self,
        id: ObjectId,
    ) -> Result<Option<MenuItem>, AppError>;

    /// `Some(at)` soft-deletes at that instant, `None` restores.
    async fn set_menu_item_deleted(
        &self,
        id: ObjectId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<MenuItem>, AppError>;
}

/// Partial shop profile update.
#[derive(Debug, Clone, Default)]
pub struct UserDetailsPatch {
    pub shop_name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl UserDetailsPatch {
    pub fn apply(&self, details: &mut UserDetails) {
        if let Some(shop_name) = &self.shop_name {
            details.shop_name = shop_name.clone();
        }
        if let Some(phone) = &self.phone {
            details.phone = phone.clone();
        }
        if let Some(address) = &self.address {
            details.address = address.clone();
        }
    }
}

#[async_trait]
pub trait ShopStore: Send + Sync {
    /// Returns the shop profile, creating the empty default on first read.
    async fn user_details(&self) -> Result<UserDetails, AppError>;

    async fn update_user_details(&self, patch: &UserDetailsPatch)
        -> Result<UserDetails, AppError>;

    /// Phone numbers are unique; a duplicate yields `AppError::Conflict`.
    async fn insert_customer(&self, customer: Customer) -> Result<Customer, AppError>;

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError>;

    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>, AppError>;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    /// Bytes the engine reports for the collection. May be unavailable.
    async fn collection_storage_size(&self, collection: &str) -> Result<u64, AppError>;

    async fn collection_document_count(&self, collection: &str) -> Result<u64, AppError>;
}

/// Everything the service needs from storage.
pub trait PosStore: SequenceStore + BillStore + MenuStore + ShopStore + StatsStore {}

impl<T> PosStore for T where T: SequenceStore + BillStore + MenuStore + ShopStore + StatsStore {}
