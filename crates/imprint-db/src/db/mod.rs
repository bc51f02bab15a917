//! Database repositories for the data access layer
//!
//! Store traits live in `store`; `template` and `upload` implement them on
//! PostgreSQL and `memory` implements them in process.

pub mod memory;
pub mod pool;
pub mod store;
pub mod template;
pub mod transaction;
pub mod upload;

pub use memory::{InMemoryTemplateStore, InMemoryUploadStore};
pub use pool::setup_database;
pub use store::{TemplateStore, UploadStore};
pub use template::PgTemplateRepository;
pub use transaction::TransactionGuard;
pub use upload::PgUploadRepository;
