// Infrastructure - storage, identity, caching and the change feed
pub mod cache;             // LRU caches (session lookups)
pub mod change_feed;       // Broadcast of committed mutations
pub mod database;          // Storage interface
pub mod id_generator;      // Snowflake ids
pub mod middleware;        // Request identity resolution
pub mod sqlite_database;   // SQLite implementation of the storage interface
pub mod viewer;            // Viewer context

pub use cache::{Cache, SessionCache};
pub use change_feed::{ChangeEvent, ChangeFeed, ChangeKind, EntityKind};
pub use database::{CascadeReport, DatabaseInterface, PageDependents};
pub use id_generator::IdGenerator;
pub use sqlite_database::SqliteDatabase;
pub use viewer::ViewerContext;
