#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, SessionSummaryRepository, SessionSummaryRow, Storage, StorageError,
};
pub use sqlite::{SqliteInitError, SqliteRepository};
