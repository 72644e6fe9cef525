use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{self, doc, oid::ObjectId, Bson, DateTime as BsonDateTime, Document},
    error::{ErrorKind, WriteFailure},
    options::{
        FindOneAndUpdateOptions, FindOneOptions, FindOptions, IndexOptions, ReturnDocument,
        UpdateOptions,
    },
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::store::{
    BillStore, MenuItemPatch, MenuListing, MenuStore, SequenceStore, ShopStore, StatsStore,
    UserDetailsPatch,
};
use crate::models::{
    collections, shop::USER_DETAILS_ID, Bill, Customer, DeletedBill, MenuItem, UserDetails,
};
use crate::utils::DateRange;

const DUPLICATE_KEY: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

fn db_error(context: &str, e: mongodb::error::Error) -> AppError {
    tracing::error!("{}: {}", context, e);
    AppError::from(e)
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match e.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == DUPLICATE_KEY,
        ErrorKind::Command(ce) => ce.code == DUPLICATE_KEY,
        _ => false,
    }
}

fn range_filter(field: &str, range: Option<DateRange>) -> Document {
    let mut filter = Document::new();
    if let Some(range) = range {
        filter.insert(
            field,
            doc! {
                "$gte": BsonDateTime::from_chrono(range.start),
                "$lt": BsonDateTime::from_chrono(range.end),
            },
        );
    }
    filter
}

fn menu_filter(listing: MenuListing) -> Document {
    match listing {
        MenuListing::Available => doc! { "isAvailable": true, "isDeleted": { "$ne": true } },
        MenuListing::Active => doc! { "isDeleted": { "$ne": true } },
        MenuListing::Deleted(range) => {
            let mut filter = range_filter("deletedAt", range);
            filter.insert("isDeleted", true);
            filter
        }
    }
}

/// Numeric fields in command replies come back as whichever BSON width fits.
fn as_u64(value: Option<&Bson>) -> Option<u64> {
    match value? {
        Bson::Int32(v) => u64::try_from(*v).ok(),
        Bson::Int64(v) => u64::try_from(*v).ok(),
        Bson::Double(v) if *v >= 0.0 => Some(*v as u64),
        _ => None,
    }
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for pos-service");

        // Newest-first listings and day-range reports
        let bills_created_index = IndexModel::builder()
            .keys(doc! { "createdAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("created_at_idx".to_string())
                    .build(),
            )
            .build();
        self.bills()
            .create_index(bills_created_index, None)
            .await
            .map_err(|e| db_error("Failed to create bills.createdAt index", e))?;

        let deleted_bills_index = IndexModel::builder()
            .keys(doc! { "deletedAt": -1 })
            .options(
                IndexOptions::builder()
                    .name("deleted_at_idx".to_string())
                    .build(),
            )
            .build();
        self.deleted_bills()
            .create_index(deleted_bills_index, None)
            .await
            .map_err(|e| db_error("Failed to create deletedBills.deletedAt index", e))?;

        // Unique over string barcodes only; items without one never collide.
        let barcode_index = IndexModel::builder()
            .keys(doc! { "barcode": 1 })
            .options(
                IndexOptions::builder()
                    .name("barcode_unique_idx".to_string())
                    .unique(true)
                    .partial_filter_expression(doc! { "barcode": { "$type": "string" } })
                    .build(),
            )
            .build();
        self.menu_items()
            .create_index(barcode_index, None)
            .await
            .map_err(|e| db_error("Failed to create menuItems.barcode index", e))?;

        let menu_listing_index = IndexModel::builder()
            .keys(doc! { "isDeleted": 1, "isAvailable": 1, "category": 1 })
            .options(
                IndexOptions::builder()
                    .name("listing_idx".to_string())
                    .build(),
            )
            .build();
        self.menu_items()
            .create_index(menu_listing_index, None)
            .await
            .map_err(|e| db_error("Failed to create menuItems listing index", e))?;

        let phone_index = IndexModel::builder()
            .keys(doc! { "phone": 1 })
            .options(
                IndexOptions::builder()
                    .name("phone_unique_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();
        self.customers()
            .create_index(phone_index, None)
            .await
            .map_err(|e| db_error("Failed to create customers.phone index", e))?;

        tracing::info!("Successfully created all MongoDB indexes");
        Ok(())
    }

    pub fn bills(&self) -> Collection<Bill> {
        self.db.collection(collections::BILLS)
    }

    pub fn deleted_bills(&self) -> Collection<DeletedBill> {
        self.db.collection(collections::DELETED_BILLS)
    }

    pub fn menu_items(&self) -> Collection<MenuItem> {
        self.db.collection(collections::MENU_ITEMS)
    }

    pub fn counters(&self) -> Collection<Document> {
        self.db.collection(collections::COUNTERS)
    }

    pub fn customers(&self) -> Collection<Customer> {
        self.db.collection(collections::CUSTOMERS)
    }

    pub fn user_details_collection(&self) -> Collection<UserDetails> {
        self.db.collection(collections::USER_DETAILS)
    }
}

#[async_trait]
impl SequenceStore for MongoDb {
    async fn ensure_sequence(&self, name: &str, start: i64) -> Result<(), AppError> {
        let options = UpdateOptions::builder().upsert(true).build();
        self.counters()
            .update_one(
                doc! { "_id": name },
                doc! { "$setOnInsert": { "seq": start } },
                options,
            )
            .await
            .map_err(|e| db_error("Failed to initialize sequence counter", e))?;
        tracing::info!(sequence = %name, "Sequence counter ready");
        Ok(())
    }

    async fn next_sequence(&self, name: &str, start: i64) -> Result<i64, AppError> {
        // One server-side read-modify-write; a missing counter is created at
        // `start` by the same upsert.
        let update = vec![doc! {
            "$set": { "seq": { "$add": [ { "$ifNull": ["$seq", start] }, 1_i64 ] } }
        }];
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();

        let counter = self
            .counters()
            .find_one_and_update(doc! { "_id": name }, update, options)
            .await
            .map_err(|e| db_error("Failed to increment sequence counter", e))?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("Sequence {} returned no document", name))
            })?;

        match counter.get("seq") {
            Some(Bson::Int64(v)) => Ok(*v),
            Some(Bson::Int32(v)) => Ok(i64::from(*v)),
            other => Err(AppError::DatabaseError(anyhow::anyhow!(
                "Sequence {} holds a non-integer value: {:?}",
                name,
                other
            ))),
        }
    }
}

#[async_trait]
impl BillStore for MongoDb {
    async fn insert_bill(&self, bill: &Bill) -> Result<(), AppError> {
        self.bills()
            .insert_one(bill, None)
            .await
            .map_err(|e| db_error("Failed to insert bill", e))?;
        Ok(())
    }

    async fn find_bill(&self, id: i64) -> Result<Option<Bill>, AppError> {
        self.bills()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| db_error("Failed to find bill", e))
    }

    async fn list_bills(&self, range: Option<DateRange>) -> Result<Vec<Bill>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();
        let cursor = self
            .bills()
            .find(range_filter("createdAt", range), options)
            .await
            .map_err(|e| db_error("Failed to list bills", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| db_error("Failed to collect bills", e))
    }

    async fn latest_bill(&self) -> Result<Option<Bill>, AppError> {
        let options = FindOneOptions::builder()
            .sort(doc! { "createdAt": -1, "_id": -1 })
            .build();
        self.bills()
            .find_one(doc! {}, options)
            .await
            .map_err(|e| db_error("Failed to find latest bill", e))
    }

    async fn archive_bill(&self, deleted: &DeletedBill) -> Result<(), AppError> {
        let mut record = bson::to_document(deleted).map_err(|e| {
            tracing::error!("Failed to serialize deleted bill: {}", e);
            AppError::InternalError(anyhow::anyhow!(e))
        })?;
        record.remove("_id");

        // Insert-if-absent keyed by bill id, so a retried delete keeps the
        // first archive record instead of writing a second one.
        let options = UpdateOptions::builder().upsert(true).build();
        self.deleted_bills()
            .update_one(
                doc! { "_id": deleted.id },
                doc! { "$setOnInsert": record },
                options,
            )
            .await
            .map_err(|e| db_error("Failed to archive bill", e))?;
        Ok(())
    }

    async fn remove_bill(&self, id: i64) -> Result<bool, AppError> {
        let result = self
            .bills()
            .delete_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| db_error("Failed to delete bill", e))?;
        Ok(result.deleted_count > 0)
    }

    async fn clear_bills(&self) -> Result<u64, AppError> {
        let result = self
            .bills()
            .delete_many(doc! {}, None)
            .await
            .map_err(|e| db_error("Failed to clear bills", e))?;
        Ok(result.deleted_count)
    }

    async fn list_deleted_bills(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<DeletedBill>, AppError> {
        let options = FindOptions::builder()
            .sort(doc! { "deletedAt": -1, "_id": -1 })
            .build();
        let cursor = self
            .deleted_bills()
            .find(range_filter("deletedAt", range), options)
            .await
            .map_err(|e| db_error("Failed to list deleted bills", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| db_error("Failed to collect deleted bills", e))
    }
}

#[async_trait]
impl MenuStore for MongoDb {
    async fn insert_menu_item(&self, mut item: MenuItem) -> Result<MenuItem, AppError> {
        let result = self.menu_items().insert_one(&item, None).await.map_err(|e| {
            if is_duplicate_key(&e) {
                AppError::Conflict(anyhow::anyhow!(
                    "Barcode {} is already in use",
                    item.barcode.as_deref().unwrap_or_default()
                ))
            } else {
                db_error("Failed to insert menu item", e)
            }
        })?;
        item.id = result.inserted_id.as_object_id();
        Ok(item)
    }

    async fn find_menu_item(&self, id: ObjectId) -> Result<Option<MenuItem>, AppError> {
        self.menu_items()
            .find_one(doc! { "_id": id }, None)
            .await
            .map_err(|e| db_error("Failed to find menu item", e))
    }

    async fn find_menu_item_by_barcode(
        &self,
        barcode: &str,
    ) -> Result<Option<MenuItem>, AppError> {
        self.menu_items()
            .find_one(doc! { "barcode": barcode }, None)
            .await
            .map_err(|e| db_error("Failed to find menu item by barcode", e))
    }

    async fn list_menu_items(&self, listing: MenuListing) -> Result<Vec<MenuItem>, AppError> {
        let sort = match listing {
            MenuListing::Deleted(_) => doc! { "deletedAt": -1 },
            _ => doc! { "category": 1, "name": 1 },
        };
        let options = FindOptions::builder().sort(sort).build();
        let cursor = self
            .menu_items()
            .find(menu_filter(listing), options)
            .await
            .map_err(|e| db_error("Failed to list menu items", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| db_error("Failed to collect menu items", e))
    }

    async fn update_menu_item(
        &self,
        id: ObjectId,
        patch: &MenuItemPatch,
    ) -> Result<Option<MenuItem>, AppError> {
        if patch.is_empty() {
            return self.find_menu_item(id).await;
        }

        let mut set = Document::new();
        if let Some(category) = &patch.category {
            set.insert("category", category);
        }
        if let Some(name) = &patch.name {
            set.insert("name", name);
        }
        if let Some(price) = patch.price {
            let price = bson::to_bson(&price)
                .map_err(|e| AppError::InternalError(anyhow::anyhow!(e)))?;
            set.insert("price", price);
        }
        if let Some(is_veg) = patch.is_veg {
            set.insert("isVeg", is_veg);
        }
        if let Some(is_available) = patch.is_available {
            set.insert("isAvailable", is_available);
        }
        if let Some(barcode) = &patch.barcode {
            set.insert("barcode", barcode);
        }

        self.menu_items()
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set }, after_update())
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::Conflict(anyhow::anyhow!(
                        "Barcode {} is already in use",
                        patch.barcode.as_deref().unwrap_or_default()
                    ))
                } else {
                    db_error("Failed to update menu item", e)
                }
            })
    }

    async fn toggle_menu_item_availability(
        &self,
        id: ObjectId,
    ) -> Result<Option<MenuItem>, AppError> {
        let update = vec![doc! { "$set": { "isAvailable": { "$not": ["$isAvailable"] } } }];
        self.menu_items()
            .find_one_and_update(doc! { "_id": id }, update, after_update())
            .await
            .map_err(|e| db_error("Failed to toggle menu item availability", e))
    }

    async fn set_menu_item_deleted(
        &self,
        id: ObjectId,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Result<Option<MenuItem>, AppError> {
        let update = match deleted_at {
            Some(at) => doc! {
                "$set": { "isDeleted": true, "deletedAt": BsonDateTime::from_chrono(at) }
            },
            None => doc! {
                "$set": { "isDeleted": false },
                "$unset": { "deletedAt": "" },
            },
        };
        self.menu_items()
            .find_one_and_update(doc! { "_id": id }, update, after_update())
            .await
            .map_err(|e| db_error("Failed to update menu item deletion state", e))
    }
}

#[async_trait]
impl ShopStore for MongoDb {
    async fn user_details(&self) -> Result<UserDetails, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        self.user_details_collection()
            .find_one_and_update(
                doc! { "_id": USER_DETAILS_ID },
                doc! { "$setOnInsert": { "shopName": "", "phone": "", "address": "" } },
                options,
            )
            .await
            .map_err(|e| db_error("Failed to load user details", e))?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("User details upsert returned nothing"))
            })
    }

    async fn update_user_details(
        &self,
        patch: &UserDetailsPatch,
    ) -> Result<UserDetails, AppError> {
        let mut set = Document::new();
        if let Some(shop_name) = &patch.shop_name {
            set.insert("shopName", shop_name);
        }
        if let Some(phone) = &patch.phone {
            set.insert("phone", phone);
        }
        if let Some(address) = &patch.address {
            set.insert("address", address);
        }
        if set.is_empty() {
            return self.user_details().await;
        }

        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        self.user_details_collection()
            .find_one_and_update(doc! { "_id": USER_DETAILS_ID }, doc! { "$set": set }, options)
            .await
            .map_err(|e| db_error("Failed to update user details", e))?
            .ok_or_else(|| {
                AppError::DatabaseError(anyhow::anyhow!("User details upsert returned nothing"))
            })
    }

    async fn insert_customer(&self, mut customer: Customer) -> Result<Customer, AppError> {
        let result = self
            .customers()
            .insert_one(&customer, None)
            .await
            .map_err(|e| {
                if is_duplicate_key(&e) {
                    AppError::Conflict(anyhow::anyhow!(
                        "Customer with phone {} already exists",
                        customer.phone
                    ))
                } else {
                    db_error("Failed to insert customer", e)
                }
            })?;
        customer.id = result.inserted_id.as_object_id();
        Ok(customer)
    }

    async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let options = FindOptions::builder().sort(doc! { "name": 1 }).build();
        let cursor = self
            .customers()
            .find(doc! {}, options)
            .await
            .map_err(|e| db_error("Failed to list customers", e))?;
        cursor
            .try_collect()
            .await
            .map_err(|e| db_error("Failed to collect customers", e))
    }

    async fn find_customer_by_phone(&self, phone: &str) -> Result<Option<Customer>, AppError> {
        self.customers()
            .find_one(doc! { "phone": phone }, None)
            .await
            .map_err(|e| db_error("Failed to find customer", e))
    }
}

#[async_trait]
impl StatsStore for MongoDb {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| db_error("MongoDB health check failed", e))?;
        Ok(())
    }

    async fn collection_storage_size(&self, collection: &str) -> Result<u64, AppError> {
        let stats = self
            .db
            .run_command(doc! { "collStats": collection }, None)
            .await
            .map_err(|e| {
                tracing::warn!(collection, "collStats unavailable: {}", e);
                AppError::from(e)
            })?;
        as_u64(stats.get("storageSize")).ok_or_else(|| {
            AppError::DatabaseError(anyhow::anyhow!(
                "collStats for {} has no storageSize",
                collection
            ))
        })
    }

    async fn collection_document_count(&self, collection: &str) -> Result<u64, AppError> {
        self.db
            .collection::<Document>(collection)
            .count_documents(doc! {}, None)
            .await
            .map_err(|e| db_error("Failed to count documents", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::ShopClock;
    use chrono::NaiveDate;

    #[test]
    fn available_filter_excludes_deleted_items() {
        let filter = menu_filter(MenuListing::Available);
        assert!(filter.get_bool("isAvailable").unwrap());
        assert_eq!(
            filter.get_document("isDeleted").unwrap(),
            &doc! { "$ne": true }
        );
    }

    #[test]
    fn deleted_filter_carries_range() {
        let clock = ShopClock::from_offset_minutes(Some(0));
        let range = clock.day(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let filter = menu_filter(MenuListing::Deleted(Some(range)));

        assert!(filter.get_bool("isDeleted").unwrap());
        let deleted_at = filter.get_document("deletedAt").unwrap();
        assert_eq!(
            deleted_at.get_datetime("$gte").unwrap(),
            &BsonDateTime::from_chrono(range.start)
        );
    }

    #[test]
    fn command_numbers_of_any_width_are_read() {
        assert_eq!(as_u64(Some(&Bson::Int32(4096))), Some(4096));
        assert_eq!(as_u64(Some(&Bson::Int64(8192))), Some(8192));
        assert_eq!(as_u64(Some(&Bson::Double(1024.0))), Some(1024));
        assert_eq!(as_u64(Some(&Bson::Int32(-1))), None);
        assert_eq!(as_u64(None), None);
    }
}
