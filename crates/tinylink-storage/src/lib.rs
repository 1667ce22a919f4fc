//! Storage backends implementing the tinylink link store contract.

pub mod file;
pub mod memory;
pub mod mysql;

pub use file::FileStore;
pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use tinylink_core::store::{LinkStore, ReadLinkStore, Result};
pub use tinylink_core::StorageError;
