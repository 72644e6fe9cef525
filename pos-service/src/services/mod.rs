pub mod bills;
pub mod database;
pub mod jwt;
pub mod memory;
pub mod metrics;
pub mod receipt;
pub mod reports;
pub mod spreadsheet;
pub mod storage_info;
pub mod store;

pub use database::MongoDb;
pub use jwt::{Claims, JwtService};
pub use memory::InMemoryStore;
pub use metrics::{get_metrics, init_metrics};
pub use receipt::Receipt;
pub use reports::{DaySummary, SortOrder};
pub use storage_info::{estimate_storage, StorageInfo};
pub use store::{
    BillStore, MenuItemPatch, MenuListing, MenuStore, PosStore, SequenceStore, ShopStore,
    StatsStore, UserDetailsPatch,
};
