// DatabaseService - database pages: schema, rows (items) and saved views

use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{current_time_millis, ItemId, PageId, UserId};
use crate::ent_framework::ent_privacy::{database_page_policy, item_policy, reader, view_policy, writer};
use crate::error::{AppError, AppResult};
use crate::infrastructure::change_feed::{ChangeFeed, ChangeKind, EntityKind};
use crate::infrastructure::database::DatabaseInterface;
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{
    ColumnDefinition, FieldMap, FieldValue, Item, Page, PageType, View, ViewConfig, ViewType, DEFAULT_VIEW_NAME,
};
use crate::rendering::field_render::{parse_input, RawInput};
use crate::schemas::{append_column, validate_fields, FieldValidation};

#[derive(Clone)]
pub struct DatabaseService {
    db: Arc<dyn DatabaseInterface>,
    ids: Arc<IdGenerator>,
    changes: Arc<ChangeFeed>,
    validation: FieldValidation,
}

impl DatabaseService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        ids: Arc<IdGenerator>,
        changes: Arc<ChangeFeed>,
        validation: FieldValidation,
    ) -> Self {
        Self {
            db,
            ids,
            changes,
            validation,
        }
    }

    /// New database page plus its default table view, committed together
    pub async fn create_database(
        &self,
        vc: &ViewerContext,
        title: &str,
        parent_id: Option<PageId>,
        schema: Vec<ColumnDefinition>,
    ) -> AppResult<PageId> {
        let owner = writer(vc)?;
        let now = current_time_millis();
        let page = Page {
            id: self.ids.next_id().into(),
            title: title.to_string(),
            content: String::new(),
            parent_id,
            owner_id: owner,
            page_type: PageType::Database,
            schema: Some(schema.into_iter().map(ColumnDefinition::normalized).collect()),
            created_at: now,
            updated_at: now,
        };
        let view = View {
            id: self.ids.next_id().into(),
            page_id: page.id,
            owner_id: owner,
            name: DEFAULT_VIEW_NAME.to_string(),
            view_type: ViewType::Table,
            config: ViewConfig::default(),
            created_at: now,
            updated_at: now,
        };

        self.db.insert_database_page(&page, &view).await?;
        info!("User {} created database {} with view {}", owner, page.id, view.id);

        self.changes
            .publish(ChangeKind::Created, EntityKind::Page, page.id, owner, None);
        self.changes
            .publish(ChangeKind::Created, EntityKind::View, view.id, owner, Some(page.id));
        Ok(page.id)
    }

    /// Appends a column; existing columns keep their order and duplicates are allowed
    pub async fn add_column(&self, vc: &ViewerContext, page_id: PageId, column: ColumnDefinition) -> AppResult<()> {
        let viewer = writer(vc)?;
        let page = database_page_policy().enforce(viewer, self.db.get_page(page_id).await?, "Database")?;

        let column_name = column.name.clone();
        let schema = append_column(page.schema, column);
        if !self.db.replace_schema(page.id, &schema, current_time_millis()).await? {
            return Err(AppError::NotFoundOrForbidden("Database not found or access denied".to_string()));
        }

        debug!("Database {} now has {} columns (added '{}')", page.id, schema.len(), column_name);
        self.changes
            .publish(ChangeKind::Updated, EntityKind::Page, page.id, viewer, None);
        Ok(())
    }

    pub async fn get_views(&self, vc: &ViewerContext, page_id: PageId) -> AppResult<Vec<View>> {
        let Some(viewer) = reader(vc) else {
            return Ok(Vec::new());
        };
        if !self.owns_database(viewer, page_id).await? {
            return Ok(Vec::new());
        }
        let views = self.db.list_views(page_id, viewer).await?;
        Ok(view_policy().filter_visible(viewer, views))
    }

    pub async fn get_items(&self, vc: &ViewerContext, page_id: PageId) -> AppResult<Vec<Item>> {
        let Some(viewer) = reader(vc) else {
            return Ok(Vec::new());
        };
        if !self.owns_database(viewer, page_id).await? {
            return Ok(Vec::new());
        }
        let items = self.db.list_items(page_id, viewer).await?;
        Ok(item_policy().filter_visible(viewer, items))
    }

    pub async fn create_item(&self, vc: &ViewerContext, page_id: PageId, fields: FieldMap) -> AppResult<ItemId> {
        let owner = writer(vc)?;
        let page = database_page_policy().enforce(owner, self.db.get_page(page_id).await?, "Database")?;
        validate_fields(page.columns(), &fields, self.validation)?;

        let now = current_time_millis();
        let item = Item {
            id: self.ids.next_id().into(),
            page_id: page.id,
            owner_id: owner,
            fields,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_item(&item).await?;
        debug!("User {} added item {} to database {}", owner, item.id, page.id);

        self.changes
            .publish(ChangeKind::Created, EntityKind::Item, item.id, owner, Some(page.id));
        Ok(item.id)
    }

    /// Replaces the whole field map; keys left out are dropped
    pub async fn update_item(&self, vc: &ViewerContext, id: ItemId, fields: FieldMap) -> AppResult<()> {
        let viewer = writer(vc)?;
        let item = item_policy().enforce(viewer, self.db.get_item(id).await?, "Item")?;

        // Rows of a deleted page have no schema left to check against
        if let Some(page) = self.db.get_page(item.page_id).await? {
            validate_fields(page.columns(), &fields, self.validation)?;
        }

        if !self.db.replace_item_fields(item.id, &fields, current_time_millis()).await? {
            return Err(AppError::NotFoundOrForbidden("Item not found or access denied".to_string()));
        }

        self.changes
            .publish(ChangeKind::Updated, EntityKind::Item, item.id, viewer, Some(item.page_id));
        Ok(())
    }

    /// Sets one cell from raw editor input, coerced to the column's type.
    /// Empty input clears the cell; the other fields are kept.
    pub async fn set_cell(&self, vc: &ViewerContext, id: ItemId, column: &str, raw: RawInput) -> AppResult<FieldValue> {
        let viewer = writer(vc)?;
        let item = item_policy().enforce(viewer, self.db.get_item(id).await?, "Item")?;
        let page = database_page_policy().enforce(viewer, self.db.get_page(item.page_id).await?, "Database")?;

        let definition = page
            .columns()
            .iter()
            .find(|c| c.name == column)
            .ok_or_else(|| AppError::BadRequest(format!("Database {} has no column '{}'", page.id, column)))?;
        let value = parse_input(definition, raw)?;

        let mut fields = item.fields;
        if value.is_null() {
            fields.remove(column);
        } else {
            fields.insert(column.to_string(), value.clone());
        }
        validate_fields(page.columns(), &fields, self.validation)?;

        if !self.db.replace_item_fields(item.id, &fields, current_time_millis()).await? {
            return Err(AppError::NotFoundOrForbidden("Item not found or access denied".to_string()));
        }

        self.changes
            .publish(ChangeKind::Updated, EntityKind::Item, item.id, viewer, Some(item.page_id));
        Ok(value)
    }

    pub async fn delete_item(&self, vc: &ViewerContext, id: ItemId) -> AppResult<()> {
        let viewer = writer(vc)?;
        let item = item_policy().enforce(viewer, self.db.get_item(id).await?, "Item")?;

        self.db.delete_item(item.id).await?;
        debug!("User {} deleted item {}", viewer, item.id);

        self.changes
            .publish(ChangeKind::Deleted, EntityKind::Item, item.id, viewer, Some(item.page_id));
        Ok(())
    }

    async fn owns_database(&self, viewer: UserId, page_id: PageId) -> AppResult<bool> {
        Ok(self
            .db
            .get_page(page_id)
            .await?
            .is_some_and(|page| database_page_policy().allows(viewer, &page)))
    }
}
