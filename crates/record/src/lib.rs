pub mod interfaces;
pub mod sqlite;

pub use interfaces::{SnapshotRepository, StoreError};
pub use sqlite::SqliteSnapshotRepository;
