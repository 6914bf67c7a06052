//! KMP Store: SQLite tables for knowledge records, ideas and pulse updates.

pub mod schema;
pub mod search;
pub mod sqlite;
pub mod stats;
pub mod traits;
pub mod types;

pub use sqlite::SqliteStore;
pub use stats::DashboardStats;
pub use traits::RecordStore;
pub use types::*;
