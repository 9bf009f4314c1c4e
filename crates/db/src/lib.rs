pub mod connection;
pub mod locks;
pub mod migrations;
pub mod store;

pub use connection::{connect, connect_with_settings, DbPool};
pub use locks::UserLocks;
pub use store::{DocumentStore, InMemoryDocumentStore, SqlDocumentStore, StoreError};
