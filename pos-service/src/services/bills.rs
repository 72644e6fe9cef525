//! Bill lifecycle: numbering on create, move-to-archive on delete.

use chrono::Utc;
use rust_decimal::Decimal;
use service_core::error::AppError;

use super::metrics::{record_bill_archived, record_bill_created};
use super::store::{PosStore, BILL_SEQUENCE, BILL_SEQUENCE_START};
use crate::models::{Bill, DeletedBill, LineItem};

/// Numbers and stores a new bill.
///
/// The sequence is incremented before the write; if the insert then fails the
/// number is gone for good and the next bill skips it.
pub async fn create_bill(
    store: &dyn PosStore,
    items: Vec<LineItem>,
    total: Decimal,
    payment_mode: Option<String>,
) -> Result<Bill, AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "A bill needs at least one item"
        )));
    }

    let id = store
        .next_sequence(BILL_SEQUENCE, BILL_SEQUENCE_START)
        .await?;
    let bill = Bill::new(id, items, total, payment_mode);

    if let Err(e) = store.insert_bill(&bill).await {
        tracing::warn!(bill_id = id, "Bill write failed; sequence number consumed");
        return Err(e);
    }

    record_bill_created();
    tracing::info!(bill_id = id, total = %bill.total, "Bill created");
    Ok(bill)
}

/// Moves an active bill into the archive.
///
/// The archive write is insert-if-absent, so repeating the call after a
/// failure between the two writes cannot produce a second archive record.
pub async fn archive_bill(store: &dyn PosStore, id: i64) -> Result<DeletedBill, AppError> {
    let bill = store
        .find_bill(id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Bill not found")))?;

    let deleted = bill.into_deleted(Utc::now());
    store.archive_bill(&deleted).await?;

    if !store.remove_bill(id).await? {
        tracing::warn!(bill_id = id, "Bill vanished before removal; archive kept");
    }

    record_bill_archived();
    tracing::info!(bill_id = id, "Bill archived");
    Ok(deleted)
}
