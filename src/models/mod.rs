// Workspace records - pages, their database rows and views, and the users owning them

pub mod item;
pub mod page;
pub mod user;
pub mod view;

pub use item::{FieldMap, FieldValue, Item};
pub use page::{ColumnDefinition, ColumnType, Page, PageType, PageUpdate, SelectOption};
pub use user::{AuthSession, Identity, User};
pub use view::{SortDirection, View, ViewConfig, ViewType, DEFAULT_VIEW_NAME};
