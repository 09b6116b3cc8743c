#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod error;
pub mod memory;
pub mod postgrest;
pub mod repository;
pub mod types;

pub use error::DataError;
pub use memory::InMemoryData;
pub use postgrest::PostgrestClient;
pub use repository::{ModelCatalog, UsageRepository, UserDirectory};
pub use types::*;
