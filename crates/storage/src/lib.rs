#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    AttemptLogRepository, InMemoryRepository, ProgressRepository, Storage, StorageError,
};
