// Service exports
pub mod memory;
pub mod postgres;

pub use memory::{Dataset, MemoryStore};
pub use postgres::{render_count, render_page, PostgresClient, StoreError};
