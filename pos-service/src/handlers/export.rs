use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use service_core::error::AppError;

use crate::dtos::export::{ExportFormat, ExportRequest, RecordsExportRequest};
use crate::services::metrics::record_export;
use crate::services::reports::{
    bill_sales_records, day_summary_records, deleted_bill_records, deleted_item_records,
    summarize_by_day,
};
use crate::services::spreadsheet::{build_table, render_xlsx};
use crate::services::{estimate_storage, MenuListing, SortOrder, StorageInfo};
use crate::utils::{DateRange, ValidatedJson};
use crate::AppState;

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn file_stem(raw: &str) -> String {
    let stem: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '-' })
        .collect();
    let stem = stem.trim_matches('-');
    if stem.is_empty() {
        "export".to_string()
    } else {
        stem.to_string()
    }
}

fn xlsx_attachment(file_stem: &str, bytes: Vec<u8>) -> Response {
    let disposition = format!("attachment; filename=\"{}.xlsx\"", file_stem);
    (
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response()
}

fn export_response(
    state: &AppState,
    kind: &'static str,
    sheet: &str,
    records: Vec<Value>,
    format: ExportFormat,
) -> Result<Response, AppError> {
    let response = match format {
        ExportFormat::Json => Json(records).into_response(),
        ExportFormat::Xlsx => {
            let table = build_table(&records, &state.clock)?;
            if table.skipped > 0 {
                tracing::warn!(kind, skipped = table.skipped, "Export dropped malformed rows");
            }
            let bytes = render_xlsx(&table, sheet)?;
            xlsx_attachment(&format!("{}-{}", kind, state.clock.today()), bytes)
        }
    };
    record_export(kind);
    Ok(response)
}

fn requested_range(state: &AppState, req: &ExportRequest) -> Result<Option<DateRange>, AppError> {
    state
        .clock
        .optional_range(req.start_date.as_deref(), req.end_date.as_deref())
}

/// Renders caller-supplied records as a workbook.
#[tracing::instrument(skip(state, req), fields(records = req.records.len()))]
pub async fn export_records(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<RecordsExportRequest>,
) -> Result<Response, AppError> {
    let table = build_table(&req.records, &state.clock)?;
    if table.skipped > 0 {
        tracing::warn!(skipped = table.skipped, "Export dropped malformed rows");
    }

    let sheet = req.sheet_name.as_deref().unwrap_or("Sheet1");
    let bytes = render_xlsx(&table, sheet)?;
    let stem = file_stem(req.file_name.as_deref().unwrap_or("export"));

    record_export("excel");
    Ok(xlsx_attachment(&stem, bytes))
}

#[tracing::instrument(skip(state, req))]
pub async fn export_day_summary(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ExportRequest>,
) -> Result<Response, AppError> {
    let range = requested_range(&state, &req)?;
    let bills = state.store.list_bills(range).await?;
    let days = summarize_by_day(&bills, &state.clock, state.tax_rate, req.order)?;

    export_response(&state, "day-summary", "Day Summary", day_summary_records(&days), req.format)
}

#[tracing::instrument(skip(state, req))]
pub async fn export_bill_sales(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ExportRequest>,
) -> Result<Response, AppError> {
    let range = requested_range(&state, &req)?;
    let mut bills = state.store.list_bills(range).await?;
    if req.order == SortOrder::Asc {
        bills.reverse();
    }

    export_response(
        &state,
        "bill-sales",
        "Bill Sales",
        bill_sales_records(&bills, state.tax_rate)?,
        req.format,
    )
}

#[tracing::instrument(skip(state, req))]
pub async fn export_deleted_items(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ExportRequest>,
) -> Result<Response, AppError> {
    let range = requested_range(&state, &req)?;
    let mut items = state
        .store
        .list_menu_items(MenuListing::Deleted(range))
        .await?;
    if req.order == SortOrder::Asc {
        items.reverse();
    }

    export_response(
        &state,
        "deleted-items",
        "Deleted Items",
        deleted_item_records(&items),
        req.format,
    )
}

#[tracing::instrument(skip(state, req))]
pub async fn export_deleted_bills(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ExportRequest>,
) -> Result<Response, AppError> {
    let range = requested_range(&state, &req)?;
    let mut bills = state.store.list_deleted_bills(range).await?;
    if req.order == SortOrder::Asc {
        bills.reverse();
    }

    export_response(
        &state,
        "deleted-bills",
        "Deleted Bills",
        deleted_bill_records(&bills),
        req.format,
    )
}

#[tracing::instrument(skip(state))]
pub async fn storage_info(State(state): State<AppState>) -> Json<StorageInfo> {
    Json(estimate_storage(state.store.as_ref(), state.storage_limit_mb).await)
}
