//! Persistence layer: the document store for submissions and assist exchanges.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::DocumentStore;
