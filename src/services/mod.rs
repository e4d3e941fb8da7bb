// Services - the operations clients call, each guarded by ent_privacy

pub mod auth_service;
pub mod database_service;
pub mod page_service;

pub use auth_service::AuthService;
pub use database_service::DatabaseService;
pub use page_service::{DeletePolicy, PageService};
