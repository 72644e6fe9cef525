use serde::Serialize;

use super::store::PosStore;
use crate::models::collections;

/// Assumed size of one document when the engine reports no statistics.
pub const FALLBACK_BYTES_PER_DOCUMENT: u64 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionUsage {
    pub name: String,
    pub bytes: u64,
    /// `true` when `bytes` is the document-count estimate.
    pub estimated: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageInfo {
    /// Percent of the limit in use.
    pub used: f64,
    pub free: f64,
    #[serde(rename = "totalSizeMB")]
    pub total_size_mb: f64,
    #[serde(rename = "totalSizeKB")]
    pub total_size_kb: f64,
    /// Limit in MB.
    #[serde(rename = "storageLimit")]
    pub storage_limit: u64,
    pub collections: Vec<CollectionUsage>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Measures every collection. A collection without statistics is estimated
/// from its document count, and one that cannot even be counted contributes
/// nothing, so this never fails as a whole.
pub async fn estimate_storage(store: &dyn PosStore, limit_mb: u64) -> StorageInfo {
    let mut usage = Vec::with_capacity(collections::ALL.len());

    for name in collections::ALL {
        let entry = match store.collection_storage_size(name).await {
            Ok(bytes) => CollectionUsage {
                name: name.to_string(),
                bytes,
                estimated: false,
            },
            Err(_) => {
                let bytes = match store.collection_document_count(name).await {
                    Ok(count) => count * FALLBACK_BYTES_PER_DOCUMENT,
                    Err(e) => {
                        tracing::warn!(collection = name, "Could not count documents: {}", e);
                        0
                    }
                };
                CollectionUsage {
                    name: name.to_string(),
                    bytes,
                    estimated: true,
                }
            }
        };
        usage.push(entry);
    }

    summarize(usage, limit_mb)
}

pub fn summarize(collections: Vec<CollectionUsage>, limit_mb: u64) -> StorageInfo {
    let total_bytes: u64 = collections.iter().map(|c| c.bytes).sum();
    let total_kb = total_bytes as f64 / 1024.0;
    let total_mb = total_kb / 1024.0;

    let used = if limit_mb == 0 {
        100.0
    } else {
        round2(total_mb / limit_mb as f64 * 100.0)
    };

    StorageInfo {
        used,
        free: round2((100.0 - used).max(0.0)),
        total_size_mb: round2(total_mb),
        total_size_kb: round2(total_kb),
        storage_limit: limit_mb,
        collections,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Bill;
    use crate::services::memory::InMemoryStore;
    use crate::services::store::BillStore;
    use rust_decimal::Decimal;

    fn usage(name: &str, bytes: u64) -> CollectionUsage {
        CollectionUsage {
            name: name.to_string(),
            bytes,
            estimated: false,
        }
    }

    #[test]
    fn percentages_are_rounded() {
        // 1.5 MB of 512 MB
        let info = summarize(vec![usage("bills", 1024 * 1024), usage("menuItems", 512 * 1024)], 512);

        assert_eq!(info.total_size_kb, 1536.0);
        assert_eq!(info.total_size_mb, 1.5);
        assert_eq!(info.used, 0.29);
        assert_eq!(info.free, 99.71);
        assert_eq!(info.storage_limit, 512);
    }

    #[test]
    fn free_never_goes_negative() {
        let info = summarize(vec![usage("bills", 4 * 1024 * 1024)], 2);
        assert_eq!(info.used, 200.0);
        assert_eq!(info.free, 0.0);
    }

    #[tokio::test]
    async fn falls_back_to_document_count() {
        let store = InMemoryStore::new();
        for id in 1..=3 {
            store
                .insert_bill(&Bill::new(id, vec![], Decimal::ZERO, None))
                .await
                .unwrap();
        }

        let info = estimate_storage(&store, 512).await;
        let bills = info
            .collections
            .iter()
            .find(|c| c.name == collections::BILLS)
            .unwrap();

        assert!(bills.estimated);
        assert_eq!(bills.bytes, 3 * FALLBACK_BYTES_PER_DOCUMENT);
        assert_eq!(info.total_size_kb, 3.0);
        assert_eq!(info.collections.len(), collections::ALL.len());
    }
}
