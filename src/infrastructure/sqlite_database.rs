use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

use crate::core::{ItemId, PageId, UserId, ViewId};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{CascadeReport, DatabaseInterface, PageDependents};
use crate::models::{ColumnDefinition, FieldMap, Item, Page, PageType, User, View, ViewConfig, ViewType};

const PAGE_COLUMNS: &str =
    "id, title, content, parent_id, owner_id, page_type, schema_json, created_at, updated_at";
const ITEM_COLUMNS: &str = "id, page_id, owner_id, fields_json, created_at, updated_at";
const VIEW_COLUMNS: &str = "id, page_id, owner_id, name, view_type, config_json, created_at, updated_at";

// Owner-restricted subtree of a page; UNION (not UNION ALL) stops on parent cycles
const SUBTREE_CTE: &str = "WITH RECURSIVE subtree(id) AS (
        SELECT id FROM pages WHERE id = ?1 AND owner_id = ?2
        UNION
        SELECT p.id FROM pages p JOIN subtree s ON p.parent_id = s.id WHERE p.owner_id = ?2
    )";

/// SQLite implementation of the workspace store
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    /// Open (creating if needed) the database at `url` and make sure tables exist
    pub async fn connect(url: &str) -> AppResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);

        let pool = if in_memory {
            // Every connection to :memory: is a separate database, so pin one for good
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            if let Some(dir) = sqlite_parent_dir(url) {
                tokio::fs::create_dir_all(&dir).await.map_err(|e| {
                    AppError::Database(format!("Failed to create database directory {}: {}", dir, e))
                })?;
            }
            SqlitePoolOptions::new().max_connections(5).connect_with(options).await?
        };

        let db = Self { pool };
        db.initialize().await?;
        info!("Connected to SQLite at {}", url);
        Ok(db)
    }

    pub async fn new_in_memory() -> AppResult<Self> {
        Self::connect("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create workspace tables and indexes if they are missing
    pub async fn initialize(&self) -> AppResult<()> {
        let statements = [
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                username TEXT UNIQUE,
                password_hash TEXT,
                is_anonymous INTEGER NOT NULL DEFAULT 0,
                created_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS sessions (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                created_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS pages (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL DEFAULT '',
                content TEXT NOT NULL DEFAULT '',
                parent_id INTEGER,
                owner_id INTEGER NOT NULL,
                page_type TEXT,
                schema_json TEXT,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                page_id INTEGER NOT NULL,
                owner_id INTEGER NOT NULL,
                fields_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE TABLE IF NOT EXISTS views (
                id INTEGER PRIMARY KEY,
                page_id INTEGER NOT NULL,
                owner_id INTEGER NOT NULL,
                name TEXT NOT NULL,
                view_type TEXT NOT NULL,
                config_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)",
            "CREATE INDEX IF NOT EXISTS idx_pages_owner ON pages(owner_id)",
            "CREATE INDEX IF NOT EXISTS idx_pages_parent ON pages(parent_id)",
            "CREATE INDEX IF NOT EXISTS idx_items_page_owner ON items(page_id, owner_id)",
            "CREATE INDEX IF NOT EXISTS idx_views_page_owner ON views(page_id, owner_id)",
        ];

        for statement in statements {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::Database(format!("Failed to initialize schema: {}", e)))?;
        }
        Ok(())
    }
}

/// Directory part of a file-backed sqlite url, if any
fn sqlite_parent_dir(url: &str) -> Option<String> {
    let path = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = path.split('?').next().unwrap_or(path);
    let parent = std::path::Path::new(path).parent()?;
    let parent = parent.to_str()?;
    if parent.is_empty() {
        None
    } else {
        Some(parent.to_string())
    }
}

fn page_from_row(row: &SqliteRow) -> AppResult<Page> {
    let page_type = PageType::from_stored(row.try_get::<Option<String>, _>("page_type")?.as_deref());
    let schema = match row.try_get::<Option<String>, _>("schema_json")? {
        Some(json) if page_type == PageType::Database => {
            Some(serde_json::from_str::<Vec<ColumnDefinition>>(&json)?)
        }
        _ => None,
    };

    Ok(Page {
        id: PageId(row.try_get("id")?),
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        parent_id: row.try_get::<Option<i64>, _>("parent_id")?.map(PageId),
        owner_id: UserId(row.try_get("owner_id")?),
        page_type,
        schema,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn item_from_row(row: &SqliteRow) -> AppResult<Item> {
    let fields_json: String = row.try_get("fields_json")?;
    Ok(Item {
        id: ItemId(row.try_get("id")?),
        page_id: PageId(row.try_get("page_id")?),
        owner_id: UserId(row.try_get("owner_id")?),
        fields: serde_json::from_str::<FieldMap>(&fields_json)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn view_from_row(row: &SqliteRow) -> AppResult<View> {
    let view_type: String = row.try_get("view_type")?;
    let config_json: String = row.try_get("config_json")?;
    Ok(View {
        id: ViewId(row.try_get("id")?),
        page_id: PageId(row.try_get("page_id")?),
        owner_id: UserId(row.try_get("owner_id")?),
        name: row.try_get("name")?,
        view_type: serde_json::from_value::<ViewType>(serde_json::Value::String(view_type))?,
        config: serde_json::from_str::<ViewConfig>(&config_json)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    Ok(User {
        id: UserId(row.try_get("id")?),
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        is_anonymous: row.try_get::<i64, _>("is_anonymous")? != 0,
        created_at: row.try_get("created_at")?,
    })
}

fn view_type_str(view_type: ViewType) -> AppResult<String> {
    match serde_json::to_value(view_type)? {
        serde_json::Value::String(s) => Ok(s),
        other => Err(AppError::Internal(format!("Unexpected view type encoding: {}", other))),
    }
}

fn schema_json(page: &Page) -> AppResult<Option<String>> {
    match (&page.page_type, &page.schema) {
        (PageType::Database, Some(schema)) => Ok(Some(serde_json::to_string(schema)?)),
        (PageType::Database, None) => Ok(Some("[]".to_string())),
        _ => Ok(None),
    }
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    async fn create_user(&self, user: &User) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, is_anonymous, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user.id.value())
        .bind(user.username.as_deref())
        .bind(user.password_hash.as_deref())
        .bind(user.is_anonymous as i64)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.message().contains("UNIQUE") => {
                AppError::Conflict("Username is already taken".to_string())
            }
            other => AppError::Database(format!("Failed to create user {}: {}", user.id, other)),
        })?;
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> AppResult<Option<User>> {
        let row = sqlx::query("SELECT id, username, password_hash, is_anonymous, created_at FROM users WHERE id = ?")
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, password_hash, is_anonymous, created_at FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_session(&self, token: &str, user_id: UserId, created_at: i64) -> AppResult<()> {
        sqlx::query("INSERT INTO sessions (token, user_id, created_at) VALUES (?, ?, ?)")
            .bind(token)
            .bind(user_id.value())
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create session for user {}: {}", user_id, e)))?;
        Ok(())
    }

    async fn get_session_user(&self, token: &str) -> AppResult<Option<UserId>> {
        let row = sqlx::query("SELECT user_id FROM sessions WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.try_get::<i64, _>("user_id")).transpose()?.map(UserId))
    }

    async fn delete_session(&self, token: &str) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn insert_page(&self, page: &Page) -> AppResult<()> {
        sqlx::query(&format!("INSERT INTO pages ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)", PAGE_COLUMNS))
            .bind(page.id.value())
            .bind(&page.title)
            .bind(&page.content)
            .bind(page.parent_id.map(PageId::value))
            .bind(page.owner_id.value())
            .bind(page.page_type.as_str())
            .bind(schema_json(page)?)
            .bind(page.created_at)
            .bind(page.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create page {}: {}", page.id, e)))?;
        Ok(())
    }

    async fn insert_database_page(&self, page: &Page, view: &View) -> AppResult<()> {
        // In-memory pools hold a single connection: no `self.pool` calls until commit
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!("INSERT INTO pages ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)", PAGE_COLUMNS))
            .bind(page.id.value())
            .bind(&page.title)
            .bind(&page.content)
            .bind(page.parent_id.map(PageId::value))
            .bind(page.owner_id.value())
            .bind(page.page_type.as_str())
            .bind(schema_json(page)?)
            .bind(page.created_at)
            .bind(page.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create database page {}: {}", page.id, e)))?;

        sqlx::query(&format!("INSERT INTO views ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)", VIEW_COLUMNS))
            .bind(view.id.value())
            .bind(view.page_id.value())
            .bind(view.owner_id.value())
            .bind(&view.name)
            .bind(view_type_str(view.view_type)?)
            .bind(serde_json::to_string(&view.config)?)
            .bind(view.created_at)
            .bind(view.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create default view for page {}: {}", page.id, e)))?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_page(&self, id: PageId) -> AppResult<Option<Page>> {
        let row = sqlx::query(&format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get page {}: {}", id, e)))?;
        row.as_ref().map(page_from_row).transpose()
    }

    async fn list_pages_by_owner(&self, owner: UserId) -> AppResult<Vec<Page>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pages WHERE owner_id = ? ORDER BY created_at, id",
            PAGE_COLUMNS
        ))
        .bind(owner.value())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(page_from_row).collect()
    }

    async fn list_children(&self, owner: UserId, parent: Option<PageId>) -> AppResult<Vec<Page>> {
        // `IS` matches NULL against NULL, which covers the root level
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pages WHERE owner_id = ? AND parent_id IS ? ORDER BY created_at, id",
            PAGE_COLUMNS
        ))
        .bind(owner.value())
        .bind(parent.map(PageId::value))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(page_from_row).collect()
    }

    async fn update_page_text(
        &self,
        id: PageId,
        title: Option<&str>,
        content: Option<&str>,
        updated_at: i64,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE pages SET title = COALESCE(?, title), content = COALESCE(?, content), updated_at = ? WHERE id = ?",
        )
        .bind(title)
        .bind(content)
        .bind(updated_at)
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(format!("Failed to update page {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn replace_schema(&self, id: PageId, schema: &[ColumnDefinition], updated_at: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE pages SET schema_json = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(schema)?)
            .bind(updated_at)
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update schema of page {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_page(&self, id: PageId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete page {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count_page_dependents(&self, id: PageId, owner: UserId) -> AppResult<PageDependents> {
        // The lowest view id on a page is the default view inserted with it
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM pages WHERE parent_id = ?1 AND owner_id = ?2) AS children,
                (SELECT COUNT(*) FROM items WHERE page_id = ?1 AND owner_id = ?2) AS items,
                (SELECT COUNT(*) FROM views WHERE page_id = ?1 AND owner_id = ?2
                    AND id <> (SELECT MIN(id) FROM views WHERE page_id = ?1)) AS views",
        )
        .bind(id.value())
        .bind(owner.value())
        .fetch_one(&self.pool)
        .await?;

        Ok(PageDependents {
            children: row.try_get::<i64, _>("children")? as u64,
            items: row.try_get::<i64, _>("items")? as u64,
            views: row.try_get::<i64, _>("views")? as u64,
        })
    }

    async fn delete_page_tree(&self, id: PageId, owner: UserId) -> AppResult<CascadeReport> {
        // In-memory pools hold a single connection: no `self.pool` calls until commit
        let mut tx = self.pool.begin().await?;

        let pages = sqlx::query(&format!("{} SELECT id FROM subtree", SUBTREE_CTE))
            .bind(id.value())
            .bind(owner.value())
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|row| row.try_get::<i64, _>("id").map(PageId))
            .collect::<Result<Vec<_>, _>>()?;

        let items = sqlx::query(&format!(
            "{} SELECT id, page_id FROM items WHERE owner_id = ?2 AND page_id IN (SELECT id FROM subtree)",
            SUBTREE_CTE
        ))
        .bind(id.value())
        .bind(owner.value())
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| Ok((ItemId(row.try_get("id")?), PageId(row.try_get("page_id")?))))
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let views = sqlx::query(&format!(
            "{} SELECT id, page_id FROM views WHERE owner_id = ?2 AND page_id IN (SELECT id FROM subtree)",
            SUBTREE_CTE
        ))
        .bind(id.value())
        .bind(owner.value())
        .fetch_all(&mut *tx)
        .await?
        .iter()
        .map(|row| Ok((ViewId(row.try_get("id")?), PageId(row.try_get("page_id")?))))
        .collect::<Result<Vec<_>, sqlx::Error>>()?;

        for table in ["items", "views"] {
            sqlx::query(&format!(
                "{} DELETE FROM {} WHERE owner_id = ?2 AND page_id IN (SELECT id FROM subtree)",
                SUBTREE_CTE, table
            ))
            .bind(id.value())
            .bind(owner.value())
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(&format!(
            "{} DELETE FROM pages WHERE id IN (SELECT id FROM subtree)",
            SUBTREE_CTE
        ))
        .bind(id.value())
        .bind(owner.value())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(
            "Deleted page tree {}: {} pages, {} items, {} views",
            id,
            pages.len(),
            items.len(),
            views.len()
        );
        Ok(CascadeReport { pages, items, views })
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        sqlx::query(&format!("INSERT INTO items ({}) VALUES (?, ?, ?, ?, ?, ?)", ITEM_COLUMNS))
            .bind(item.id.value())
            .bind(item.page_id.value())
            .bind(item.owner_id.value())
            .bind(serde_json::to_string(&item.fields)?)
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to create item {}: {}", item.id, e)))?;
        Ok(())
    }

    async fn get_item(&self, id: ItemId) -> AppResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS))
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to get item {}: {}", id, e)))?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self, page: PageId, owner: UserId) -> AppResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM items WHERE page_id = ? AND owner_id = ? ORDER BY created_at, id",
            ITEM_COLUMNS
        ))
        .bind(page.value())
        .bind(owner.value())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn replace_item_fields(&self, id: ItemId, fields: &FieldMap, updated_at: i64) -> AppResult<bool> {
        let result = sqlx::query("UPDATE items SET fields_json = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(fields)?)
            .bind(updated_at)
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to update item {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_item(&self, id: ItemId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Failed to delete item {}: {}", id, e)))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_views(&self, page: PageId, owner: UserId) -> AppResult<Vec<View>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM views WHERE page_id = ? AND owner_id = ? ORDER BY created_at, id",
            VIEW_COLUMNS
        ))
        .bind(page.value())
        .bind(owner.value())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(view_from_row).collect()
    }
}
