pub mod models;
pub mod query;
pub mod store;

pub use query::{ListQuery, Page, Pagination};
pub use store::{Collection, Document, Store, StoreError};
