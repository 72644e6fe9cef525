use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::services::SortOrder;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Xlsx,
    Json,
}

/// Body of the report exports.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ExportRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default)]
    pub order: SortOrder,
}

/// Body of `POST /export/excel`: arbitrary records rendered as-is.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RecordsExportRequest {
    #[validate(length(min = 1, message = "At least one record is required"))]
    pub records: Vec<Value>,

    #[serde(default)]
    pub sheet_name: Option<String>,

    #[serde(default)]
    pub file_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn export_request_defaults() {
        let req: ExportRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(req.format, ExportFormat::Xlsx);
        assert_eq!(req.order, SortOrder::Desc);

        let req: ExportRequest =
            serde_json::from_value(json!({"format": "json", "order": "asc"})).unwrap();
        assert_eq!(req.format, ExportFormat::Json);
        assert_eq!(req.order, SortOrder::Asc);
    }
}
