// Database Interface - record-level storage for the workspace
// Authorization is not this layer's job: callers pass the owner explicitly
// and services decide what a viewer may touch.

use async_trait::async_trait;

use crate::core::{ItemId, PageId, UserId, ViewId};
use crate::error::AppResult;
use crate::models::{ColumnDefinition, FieldMap, Item, Page, User, View};

/// The owner's rows that still point at a page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageDependents {
    pub children: u64,
    pub items: u64,
    /// Views besides the one created together with a database page
    pub views: u64,
}

impl PageDependents {
    pub fn is_empty(&self) -> bool {
        self.children == 0 && self.items == 0 && self.views == 0
    }
}

/// Rows removed by a page deletion; items and views carry their page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub pages: Vec<PageId>,
    pub items: Vec<(ItemId, PageId)>,
    pub views: Vec<(ViewId, PageId)>,
}

#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    // Users and sessions
    async fn create_user(&self, user: &User) -> AppResult<()>;
    async fn get_user(&self, id: UserId) -> AppResult<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn create_session(&self, token: &str, user_id: UserId, created_at: i64) -> AppResult<()>;
    async fn get_session_user(&self, token: &str) -> AppResult<Option<UserId>>;
    async fn delete_session(&self, token: &str) -> AppResult<bool>;

    // Pages
    async fn insert_page(&self, page: &Page) -> AppResult<()>;
    /// Inserts a database page and its first view atomically
    async fn insert_database_page(&self, page: &Page, view: &View) -> AppResult<()>;
    async fn get_page(&self, id: PageId) -> AppResult<Option<Page>>;
    async fn list_pages_by_owner(&self, owner: UserId) -> AppResult<Vec<Page>>;
    async fn list_children(&self, owner: UserId, parent: Option<PageId>) -> AppResult<Vec<Page>>;
    async fn update_page_text(
        &self,
        id: PageId,
        title: Option<&str>,
        content: Option<&str>,
        updated_at: i64,
    ) -> AppResult<bool>;
    async fn replace_schema(&self, id: PageId, schema: &[ColumnDefinition], updated_at: i64) -> AppResult<bool>;
    async fn delete_page(&self, id: PageId) -> AppResult<bool>;
    async fn count_page_dependents(&self, id: PageId, owner: UserId) -> AppResult<PageDependents>;
    /// Deletes the owner's subtree rooted at `id` with its items and views
    async fn delete_page_tree(&self, id: PageId, owner: UserId) -> AppResult<CascadeReport>;

    // Items
    async fn insert_item(&self, item: &Item) -> AppResult<()>;
    async fn get_item(&self, id: ItemId) -> AppResult<Option<Item>>;
    async fn list_items(&self, page: PageId, owner: UserId) -> AppResult<Vec<Item>>;
    async fn replace_item_fields(&self, id: ItemId, fields: &FieldMap, updated_at: i64) -> AppResult<bool>;
    async fn delete_item(&self, id: ItemId) -> AppResult<bool>;

    // Views
    async fn list_views(&self, page: PageId, owner: UserId) -> AppResult<Vec<View>>;
}
