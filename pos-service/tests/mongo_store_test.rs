//! Store behaviour against a live MongoDB. Run with
//! `TEST_MONGODB_URI=mongodb://localhost:27017 cargo test -- --ignored`.

mod common;

use chrono::Utc;
use pos_service::models::{Bill, LineItem, MenuItem};
use pos_service::services::store::{BILL_SEQUENCE, BILL_SEQUENCE_START};
use pos_service::services::{BillStore, MenuStore, MongoDb, SequenceStore};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashSet;
use std::sync::Arc;

async fn connect() -> MongoDb {
    let config = common::test_config();
    let db = MongoDb::connect(&config.mongodb.uri, &config.mongodb.database)
        .await
        .expect("MongoDB not reachable");
    db.initialize_indexes().await.expect("Failed to create indexes");
    db
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn concurrent_sequence_values_are_unique() {
    let db = Arc::new(connect().await);
    db.ensure_sequence(BILL_SEQUENCE, BILL_SEQUENCE_START)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..25 {
        let db = db.clone();
        handles.push(tokio::spawn(async move {
            db.next_sequence(BILL_SEQUENCE, BILL_SEQUENCE_START)
                .await
                .unwrap()
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        assert!(ids.insert(handle.await.unwrap()));
    }
    assert_eq!(ids.len(), 25);
    assert_eq!(*ids.iter().min().unwrap(), BILL_SEQUENCE_START + 1);
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn archiving_twice_keeps_one_record() {
    let db = connect().await;
    let bill = Bill::new(
        BILL_SEQUENCE_START + 1,
        vec![LineItem::new("Tea".to_string(), 2, Decimal::from(10), None).unwrap()],
        Decimal::from(20),
        None,
    );
    db.insert_bill(&bill).await.unwrap();

    let deleted = bill.clone().into_deleted(Utc::now());
    db.archive_bill(&deleted).await.unwrap();
    db.archive_bill(&deleted).await.unwrap();
    assert!(db.remove_bill(bill.id).await.unwrap());

    assert_eq!(db.list_deleted_bills(None).await.unwrap().len(), 1);
    assert!(db.find_bill(bill.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires a running MongoDB"]
async fn barcode_index_allows_many_missing_barcodes() {
    let db = connect().await;
    let item = |name: &str, barcode: Option<&str>| {
        MenuItem::new(
            "Tiffin".to_string(),
            name.to_string(),
            Decimal::from(30),
            true,
            None,
            barcode.map(str::to_string),
        )
    };

    db.insert_menu_item(item("Idly", None)).await.unwrap();
    db.insert_menu_item(item("Dosa", None)).await.unwrap();
    db.insert_menu_item(item("Vada", Some("123"))).await.unwrap();

    let duplicate = db.insert_menu_item(item("Pongal", Some("123"))).await;
    assert!(matches!(duplicate, Err(AppError::Conflict(_))));
}
