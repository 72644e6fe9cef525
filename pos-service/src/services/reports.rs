//! Sales reporting: per-day aggregation and the flat records fed to exports.

use chrono::{NaiveDate, SecondsFormat};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use service_core::error::AppError;
use std::collections::BTreeMap;

use crate::models::{Bill, DeletedBill, LineItem, MenuItem, DEFAULT_PAYMENT_MODE};
use crate::utils::ShopClock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySummary {
    pub date: NaiveDate,
    pub bill_count: u64,
    pub tax_sum: Decimal,
    pub total_sum: Decimal,
}

fn out_of_range(what: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!("{} is out of range", what))
}

/// Tax on one bill total, rounded to paise.
pub fn tax_for(total: Decimal, tax_rate: Decimal) -> Result<Decimal, AppError> {
    total
        .checked_mul(tax_rate)
        .map(|tax| tax.round_dp(2))
        .ok_or_else(|| out_of_range("Tax"))
}

/// Groups bills by the shop-local date of `createdAt`.
pub fn summarize_by_day(
    bills: &[Bill],
    clock: &ShopClock,
    tax_rate: Decimal,
    order: SortOrder,
) -> Result<Vec<DaySummary>, AppError> {
    let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();

    for bill in bills {
        let date = clock.local_date(bill.created_at);
        let day = days.entry(date).or_insert_with(|| DaySummary {
            date,
            bill_count: 0,
            tax_sum: Decimal::ZERO,
            total_sum: Decimal::ZERO,
        });
        day.bill_count += 1;
        day.tax_sum = day
            .tax_sum
            .checked_add(tax_for(bill.total, tax_rate)?)
            .ok_or_else(|| out_of_range("Day tax"))?;
        day.total_sum = day
            .total_sum
            .checked_add(bill.total)
            .ok_or_else(|| out_of_range("Day total"))?;
    }

    let summaries = days.into_values();
    Ok(match order {
        SortOrder::Asc => summaries.collect(),
        SortOrder::Desc => summaries.rev().collect(),
    })
}

fn describe_items(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} x{}", item.name, item.quantity))
        .collect::<Vec<_>>()
        .join(", ")
}

fn item_count(items: &[LineItem]) -> i64 {
    items.iter().map(|item| i64::from(item.quantity)).sum()
}

pub fn day_summary_records(days: &[DaySummary]) -> Vec<Value> {
    days.iter()
        .map(|day| {
            json!({
                "date": day.date.format("%Y-%m-%d").to_string(),
                "billCount": day.bill_count,
                "taxSum": day.tax_sum,
                "totalSum": day.total_sum,
            })
        })
        .collect()
}

pub fn bill_sales_records(bills: &[Bill], tax_rate: Decimal) -> Result<Vec<Value>, AppError> {
    bills
        .iter()
        .map(|bill| -> Result<Value, AppError> {
            Ok(json!({
                "billId": bill.id,
                "createdAt": bill.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                "items": describe_items(&bill.items),
                "itemCount": item_count(&bill.items),
                "paymentMode": bill.payment_mode.as_deref().unwrap_or(DEFAULT_PAYMENT_MODE),
                "tax": tax_for(bill.total, tax_rate)?,
                "total": bill.total,
            }))
        })
        .collect()
}

pub fn deleted_bill_records(bills: &[DeletedBill]) -> Vec<Value> {
    bills
        .iter()
        .map(|bill| {
            json!({
                "billId": bill.id,
                "createdAt": bill.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                "deletedAt": bill.deleted_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                "items": describe_items(&bill.items),
                "paymentMode": bill.payment_mode,
                "total": bill.total,
            })
        })
        .collect()
}

pub fn deleted_item_records(items: &[MenuItem]) -> Vec<Value> {
    items
        .iter()
        .map(|item| {
            let mut record = json!({
                "category": item.category,
                "name": item.name,
                "price": item.price,
                "isVeg": item.is_veg,
                "barcode": item.barcode.clone().unwrap_or_default(),
            });
            if let Some(deleted_at) = item.deleted_at {
                record["deletedAt"] =
                    Value::String(deleted_at.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
            record
        })
        .collect()
}
