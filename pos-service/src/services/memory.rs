use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use super::store::{
    BillStore, MenuItemPatch, MenuListing, MenuStore, SequenceStore, ShopStore, StatsStore,
    UserDetailsPatch,
};
use crate::models::{collections, Bill, Customer, DeletedBill, MenuItem, UserDetails};
use crate::utils::DateRange;

/// Process-local store used by tests and the `memory` backend. All state
/// lives behind one mutex so every operation is atomic, like a single-node
/// database without transactions spanning calls.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    counters: HashMap<String, i64>,
    bills: BTreeMap<i64, Bill>,
    deleted_bills: BTreeMap<i64, DeletedBill>,
    menu_items: Vec<MenuItem>,
    user_details: Option<UserDetails>,
    customers: Vec<Customer>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>, AppError> {
        self.state
            .lock()
            .map_err(|_| AppError::InternalError(anyhow::anyhow!("in-memory store lock poisoned")))
    }
}

fn barcode_taken(items: &[MenuItem], barcode: Option<&str>, except: Option<ObjectId>) -> bool {
    let Some(barcode) = barcode else {
        return false;
    };
    items
        .iter()
        .any(|i| i.id != except && i.barcode.as_deref() == Some(barcode))
}

fn barcode_conflict(barcode: &str) -> AppError {
    AppError::Conflict(anyhow::anyhow!("Barcode {} is already in use", barcode))
}

#[async_trait]
impl SequenceStore for InMemoryStore {
    async fn ensure_sequence(&self, name: &str, start: i64) -> Result<(), AppError> {
        self.state()?.counters.entry(name.to_string()).or_insert(start);
        Ok(())
    }

    async fn next_sequence(&self, name: &str, start: i64) -> Result<i64, AppError> {
        let mut state = self.state()?;
        let value = state.counters.entry(name.to_string()).or_insert(start);
        *value += 1;
        Ok(*value)
    }
}

#[async_trait]
impl BillStore for InMemoryStore {
    async fn insert_bill(&self, bill: &Bill) -> Result<(), AppError> {
        let mut state = self.state()?;
        if state.bills.contains_key(&bill.id) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Bill {} already exists",
                bill.id
            )));
        }
        state.bills.insert(bill.id, bill.clone());
        Ok(())
    }

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>, AppError> {
        Ok(self.state()?.bills.get(&id).cloned())
    }

    async fn list_bills(&self, range: Option<DateRange>) -> Result<Vec<Bill>, AppError> {
        let state = self.state()?;
        let mut bills: Vec<Bill> = state
            .bills
            .values()
            .filter(|b| range.map_or(true, |r| r.contains(b.created_at)))
            .cloned()
            .collect();
        bills.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bills)
    }

    async fn latest_bill(&self) -> Result<Option<Bill>, AppError> {
        Ok(self.list_bills(None).await?.into_iter().next())
    }

    async fn archive_bill(&self, deleted: &DeletedBill) -> Result<(), AppError> {
        self.state()?
            .deleted_bills
            .entry(deleted.id)
            .or_insert_with(|| deleted.clone());
        Ok(())
    }

    async fn remove_bill(&self, id: i64) -> Result<bool, AppError> {
        Ok(self.state()?.bills.remove(&id).is_some())
    }

    async fn clear_bills(&self) -> Result<u64, AppError> {
        let mut state = self.state()?;
        let count = state.bills.len() as u64;
        state.bills.clear();
        Ok(count)
    }

    async fn list_deleted_bills(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<DeletedBill>, AppError> {
        let state = self.state()?;
        let mut bills: Vec<DeletedBill> = state
            .deleted_bills
            .values()
            .filter(|b| range.map_or(true, |r| r.contains(b.deleted_at)))
            .cloned()
            .collect();
        bills.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at).then(b.id.cmp(&a.id)));
        Ok(bills)
    }
}

#[async_trait]
impl MenuStore for InMemoryStore {
    async fn insert_menu_item(&self, mut item: MenuItem) -> Result<MenuItem, AppError> {
        let mut state = self.state()?;
        if barcode_taken(&state.menu_items, item.barcode.as_deref(), None) {
            return Err(barcode_conflict(item.barcode.as_deref().unwrap_or_default()));
        }
        item.id = Some(ObjectId::new());
        state.menu_items.push(item.clone());
        Ok(item)
    }

    async fn find_menu_item(&self, id: ObjectId) -> Result<Option<MenuItem>, AppError> {
        Ok(self
            .state()?
            .menu_items
            .iter()
            .find(|i| i.id == Some(id))
            .cloned())
    }

    async fn find_menu_item_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<MenuItem>, AppError> {
        Ok(self
            .state()?
            .menu_items
            .iter()
            .find(|i| i.barcode.as_deref() == Some(barcode))
            .cloned())
    }

    async fn list_menu_items(&self, listing: MenuListing) -> Result<Vec<MenuItem>, AppError> {
        let state = self.state()?;
        let mut items: Vec<MenuItem> = state
            .menu_items
            .iter()
            .filter(|i| listing.matches(i))
            .cloned()
            .collect();
        match listing {
            MenuListing::Deleted(_) => items.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at)),
            _ => items.sort_by(|a, b| a.category.cmp(&b.category).then(a.name.cmp(&b.name))),
        }
        Ok(items)
    }

    async fn update_menu_item(
        &self,
        id: ObjectId,
        patch: &MenuItemPatch,
    ) -> Result<Option<MenuItem>, AppError> {
        let mut state = self.state()?;
        if barcode_taken(&state.menu_items, patch.barcode.as_deref(), Some(id)) {
            return Err(barcode_conflict(patch.barcode.as_deref().unwrap_or_default()));
        }
        Ok(state
            .menu_items
            .iter_mut()
            .find(|i| i.id == Some(id))
            .map(|item| {
                patch.apply(item);
                item.clone()
            }))
    }

    async fn toggle_menu_item_availability(
        &self,
        id: ObjectId,
    ) -> Result<Option<MenuItem>, AppError> {
        let mut state = self.state()?;
        Ok(state
            .menu_items
            .iter_mut()
            .find(|i| i.id == Some(id))
            .map(|item| {
                item.is_available = !item.is_available;
                item.clone()
            }))
    }

    async fn set_menu_item_deleted(
        &self,
        id: ObjectId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<MenuItem>, AppError> {
        let mut state = self.state()?;
        Ok(state
            .menu_items
            .iter_mut()
            .find(|i| i.id == Some(id))
            .map(|item| {
                match deleted_at {
                    Some(at) => item.mark_deleted(at),
                    None => item.restore(),
                }
                item.clone()
            }))
    }
}

#[async_trait]
impl ShopStore for InMemoryStore {
    async fn user_details(&self) -> Result<UserDetails, AppError> {
        Ok(self
            .state()?
            .user_details
            .get_or_insert_with(UserDetails::default)
            .clone())
    }

    async fn update_user_details(
        &self,
        patch: &UserDetailsPatch,
    ) -> Result<UserDetails, AppError> {
        let mut state = self.state()?;
        let details = state.user_details.get_or_insert_with(UserDetails::default);
        patch.apply(details);
        Ok(details.clone())
    }

    async fn insert_customer(&self, mut customer: Customer) -> Result<Customer, AppError> {
        let mut state = self.state()?;
        if state.customers.iter().any(|c| c.phone == customer.phone) {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Customer with phone {} already exists",
                customer.phone
            )));
        }
        customer.id = Some(ObjectId::new());
        state.customers.push(customer.clone());
        Ok(customer)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let mut customers = self.state()?.customers.clone();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>, AppError> {
        Ok(self
            .state()?
            .customers
            .iter()
            .find(|c| c.phone == phone)
            .cloned())
    }
}

#[async_trait]
impl StatsStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        self.state().map(|_| ())
    }

    async fn collection_storage_size(&self, collection: &str) -> Result<u64, AppError> {
        tracing::debug!(collection, "In-memory store has no storage statistics");
        Err(AppError::ServiceUnavailable)
    }

    async fn collection_document_count(&self, collection: &str) -> Result<u64, AppError> {
        let state = self.state()?;
        let count = match collection {
            collections::BILLS => state.bills.len(),
            collections::DELETED_BILLS => state.deleted_bills.len(),
            collections::MENU_ITEMS => state.menu_items.len(),
            collections::COUNTERS => state.counters.len(),
            collections::CUSTOMERS => state.customers.len(),
            collections::USER_DETAILS => usize::from(state.user_details.is_some()),
            other => {
                return Err(AppError::NotFound(anyhow::anyhow!(
                    "Unknown collection: {}",
                    other
                )))
            }
        };
        Ok(count as u64)
    }
}
