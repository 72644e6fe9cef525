//! Turns loosely shaped JSON records into a single-sheet workbook.
//!
//! One bad record never sinks an export: rows that are not objects or carry
//! an unreadable date are logged and dropped. Only an export with no usable
//! rows at all is an error.

use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde_json::Value;
use service_core::error::AppError;

use crate::utils::ShopClock;

const MAX_SHEET_NAME_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub skipped: usize,
}

/// Keys whose values are timestamps: `createdAt`, `startDate`, `date`, ...
pub fn is_date_key(key: &str) -> bool {
    key == "date" || key.ends_with("At") || key.ends_with("Date")
}

fn date_cell(value: &Value, clock: &ShopClock) -> Option<Cell> {
    if value.is_null() {
        return Some(Cell::Empty);
    }
    if let Some(day) = value
        .as_str()
        .and_then(|raw| NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok())
    {
        return Some(Cell::Text(day.format("%d/%m/%Y").to_string()));
    }
    clock
        .parse_instant(value)
        .map(|instant| Cell::Text(clock.format(instant)))
}

fn plain_cell(value: &Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Bool(b) => Cell::Bool(*b),
        Value::Number(n) => n
            .as_f64()
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::Text(n.to_string())),
        Value::String(s) => Cell::Text(s.clone()),
        other => Cell::Text(other.to_string()),
    }
}

/// Builds the header (union of keys, first-seen order) and one row per
/// well-formed record.
pub fn build_table(records: &[Value], clock: &ShopClock) -> Result<SheetTable, AppError> {
    let mut headers: Vec<String> = Vec::new();
    let mut parsed: Vec<Vec<(String, Cell)>> = Vec::new();
    let mut skipped = 0;

    'records: for (index, record) in records.iter().enumerate() {
        let Some(fields) = record.as_object() else {
            tracing::warn!(row = index, "Skipping export row: not an object");
            skipped += 1;
            continue;
        };

        let mut cells = Vec::with_capacity(fields.len());
        for (key, value) in fields {
            let cell = if is_date_key(key) {
                match date_cell(value, clock) {
                    Some(cell) => cell,
                    None => {
                        tracing::warn!(row = index, field = %key, "Skipping export row: unreadable date");
                        skipped += 1;
                        continue 'records;
                    }
                }
            } else {
                plain_cell(value)
            };
            cells.push((key.clone(), cell));
        }

        for (key, _) in &cells {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
        parsed.push(cells);
    }

    if parsed.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "No valid rows to export"
        )));
    }

    let rows = parsed
        .into_iter()
        .map(|cells| {
            headers
                .iter()
                .map(|header| {
                    cells
                        .iter()
                        .find(|(key, _)| key == header)
                        .map(|(_, cell)| cell.clone())
                        .unwrap_or(Cell::Empty)
                })
                .collect()
        })
        .collect();

    Ok(SheetTable {
        headers,
        rows,
        skipped,
    })
}

/// Excel forbids `[]:*?/\` in sheet names and caps them at 31 characters.
pub fn sheet_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .take(MAX_SHEET_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim().trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet1".to_string()
    } else {
        cleaned
    }
}

fn xlsx_error(e: XlsxError) -> AppError {
    tracing::error!("Failed to render workbook: {}", e);
    AppError::InternalError(anyhow::anyhow!(e))
}

pub fn render_xlsx(table: &SheetTable, name: &str) -> Result<Vec<u8>, AppError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(sheet_name(name)).map_err(xlsx_error)?;

    for (col, header) in table.headers.iter().enumerate() {
        let col = col as u16;
        worksheet
            .write_string_with_format(0, col, header, &header_format)
            .map_err(xlsx_error)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let row_num = index as u32 + 1;
        for (col, cell) in row.iter().enumerate() {
            let col = col as u16;
            match cell {
                Cell::Empty => {}
                Cell::Text(text) => {
                    worksheet
                        .write_string(row_num, col, text)
                        .map_err(xlsx_error)?;
                }
                Cell::Number(n) => {
                    worksheet.write_number(row_num, col, *n).map_err(xlsx_error)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b).map_err(xlsx_error)?;
                }
            }
        }
    }

    worksheet.autofit();
    workbook.save_to_buffer().map_err(xlsx_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clock() -> ShopClock {
        ShopClock::from_offset_minutes(Some(330))
    }

    #[test]
    fn malformed_date_row_is_skipped_not_fatal() {
        let records = vec![
            json!({"billId": 1, "createdAt": "2024-03-01T10:00:00Z", "total": 20}),
            json!({"billId": 2, "createdAt": "2024-03-01T11:00:00Z", "total": 35.5}),
            json!({"billId": 3, "createdAt": "not a date", "total": 10}),
            json!({"billId": 4, "createdAt": "2024-03-02", "total": 12}),
            json!({"billId": 5, "createdAt": 1709287200000_i64, "total": 8}),
        ];
        let table = build_table(&records, &clock()).unwrap();

        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.skipped, 1);
        assert_eq!(table.headers, vec!["billId", "createdAt", "total"]);
        assert_eq!(table.rows[0][1], Cell::Text("01/03/2024, 15:30:00".to_string()));
        assert_eq!(table.rows[2][1], Cell::Text("02/03/2024".to_string()));
    }

    #[test]
    fn header_is_union_of_keys_in_first_seen_order() {
        let records = vec![
            json!({"name": "Idly", "price": 30}),
            json!({"name": "Vada", "barcode": "8901", "price": 15}),
            json!("stray string"),
        ];
        let table = build_table(&records, &clock()).unwrap();

        assert_eq!(table.headers, vec!["name", "price", "barcode"]);
        assert_eq!(table.rows[0][2], Cell::Empty);
        assert_eq!(table.rows[1][2], Cell::Text("8901".to_string()));
        assert_eq!(table.skipped, 1);
    }

    #[test]
    fn export_with_no_valid_rows_fails() {
        let records = vec![json!(42), json!({"deletedAt": "yesterday"})];
        let err = build_table(&records, &clock()).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert!(build_table(&[], &clock()).is_err());
    }

    #[test]
    fn date_keys_by_suffix() {
        assert!(is_date_key("createdAt"));
        assert!(is_date_key("startDate"));
        assert!(is_date_key("date"));
        assert!(!is_date_key("category"));
        assert!(!is_date_key("updates"));
    }

    #[test]
    fn sheet_names_are_sanitized() {
        assert_eq!(sheet_name("Sales [Mar/24]"), "Sales Mar24");
        assert_eq!(sheet_name("???"), "Sheet1");
        assert_eq!(sheet_name(&"x".repeat(40)).len(), 31);
    }

    #[test]
    fn renders_a_zip_container() {
        let table = build_table(&[json!({"name": "Tea", "isVeg": true})], &clock()).unwrap();
        let bytes = render_xlsx(&table, "Menu").unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
