// PageService - the caller's page tree: listing, creation, edits and deletion

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{current_time_millis, PageId};
use crate::ent_framework::ent_privacy::{page_policy, reader, writer};
use crate::error::{AppError, AppResult};
use crate::infrastructure::change_feed::{ChangeFeed, ChangeKind, EntityKind};
use crate::infrastructure::database::{CascadeReport, DatabaseInterface};
use crate::infrastructure::id_generator::IdGenerator;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{Page, PageType, PageUpdate};

/// What happens to children, items and views when a page is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletePolicy {
    /// Delete the page row only; dependents stay behind as orphans
    #[default]
    Orphan,
    /// Delete the owner's whole subtree with its items and views
    Cascade,
    /// Refuse while anything still references the page
    Reject,
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeletePolicy::Orphan => "orphan",
            DeletePolicy::Cascade => "cascade",
            DeletePolicy::Reject => "reject",
        };
        f.write_str(name)
    }
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "orphan" => Ok(DeletePolicy::Orphan),
            "cascade" => Ok(DeletePolicy::Cascade),
            "reject" => Ok(DeletePolicy::Reject),
            other => Err(format!(
                "unknown delete policy '{}', expected orphan, cascade or reject",
                other
            )),
        }
    }
}

#[derive(Clone)]
pub struct PageService {
    db: Arc<dyn DatabaseInterface>,
    ids: Arc<IdGenerator>,
    changes: Arc<ChangeFeed>,
    delete_policy: DeletePolicy,
}

impl PageService {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        ids: Arc<IdGenerator>,
        changes: Arc<ChangeFeed>,
        delete_policy: DeletePolicy,
    ) -> Self {
        Self {
            db,
            ids,
            changes,
            delete_policy,
        }
    }

    /// Every page the caller owns; nothing for anonymous callers
    pub async fn list(&self, vc: &ViewerContext) -> AppResult<Vec<Page>> {
        let Some(viewer) = reader(vc) else {
            return Ok(Vec::new());
        };
        let pages = self.db.list_pages_by_owner(viewer).await?;
        Ok(page_policy().filter_visible(viewer, pages))
    }

    /// Direct children of `parent_id`, or the root pages when it is `None`
    pub async fn get_children(&self, vc: &ViewerContext, parent_id: Option<PageId>) -> AppResult<Vec<Page>> {
        let Some(viewer) = reader(vc) else {
            return Ok(Vec::new());
        };
        let pages = self.db.list_children(viewer, parent_id).await?;
        Ok(page_policy().filter_visible(viewer, pages))
    }

    /// A single page if the caller owns it
    pub async fn get(&self, vc: &ViewerContext, id: PageId) -> AppResult<Option<Page>> {
        let Some(viewer) = reader(vc) else {
            return Ok(None);
        };
        let page = self.db.get_page(id).await?;
        Ok(page.filter(|p| page_policy().allows(viewer, p)))
    }

    pub async fn create(&self, vc: &ViewerContext, title: &str, parent_id: Option<PageId>) -> AppResult<PageId> {
        let owner = writer(vc)?;
        let now = current_time_millis();
        let page = Page {
            id: self.ids.next_id().into(),
            title: title.to_string(),
            content: String::new(),
            parent_id,
            owner_id: owner,
            page_type: PageType::Document,
            schema: None,
            created_at: now,
            updated_at: now,
        };

        self.db.insert_page(&page).await?;
        info!("User {} created page {}", owner, page.id);
        self.changes
            .publish(ChangeKind::Created, EntityKind::Page, page.id, owner, None);
        Ok(page.id)
    }

    /// Applies only the fields present in `update`
    pub async fn update(&self, vc: &ViewerContext, id: PageId, update: PageUpdate) -> AppResult<()> {
        let viewer = writer(vc)?;
        let page = page_policy().enforce(viewer, self.db.get_page(id).await?, "Page")?;
        if update.is_empty() {
            return Ok(());
        }

        let updated = self
            .db
            .update_page_text(
                page.id,
                update.title.as_deref(),
                update.content.as_deref(),
                current_time_millis(),
            )
            .await?;
        if !updated {
            return Err(AppError::NotFoundOrForbidden("Page not found or access denied".to_string()));
        }

        self.changes
            .publish(ChangeKind::Updated, EntityKind::Page, page.id, viewer, None);
        Ok(())
    }

    /// Removes a page under the configured `DeletePolicy`, publishing one event per removed row
    pub async fn remove(&self, vc: &ViewerContext, id: PageId) -> AppResult<()> {
        let viewer = writer(vc)?;
        let page = page_policy().enforce(viewer, self.db.get_page(id).await?, "Page")?;

        let removed = match self.delete_policy {
            DeletePolicy::Orphan => {
                self.db.delete_page(page.id).await?;
                CascadeReport {
                    pages: vec![page.id],
                    ..CascadeReport::default()
                }
            }
            DeletePolicy::Reject => {
                let dependents = self.db.count_page_dependents(page.id, viewer).await?;
                if !dependents.is_empty() {
                    warn!(
                        "Refusing to delete page {}: {} children, {} items, {} views",
                        page.id, dependents.children, dependents.items, dependents.views
                    );
                    return Err(AppError::Conflict(format!(
                        "Page {} still has {} child pages, {} items and {} extra views",
                        page.id, dependents.children, dependents.items, dependents.views
                    )));
                }
                // Takes the default view of a database page along with it
                self.db.delete_page_tree(page.id, viewer).await?
            }
            DeletePolicy::Cascade => self.db.delete_page_tree(page.id, viewer).await?,
        };

        info!(
            "User {} deleted page {} ({} pages, {} items, {} views)",
            viewer,
            page.id,
            removed.pages.len(),
            removed.items.len(),
            removed.views.len()
        );
        for (item_id, page_id) in removed.items {
            self.changes
                .publish(ChangeKind::Deleted, EntityKind::Item, item_id, viewer, Some(page_id));
        }
        for (view_id, page_id) in removed.views {
            self.changes
                .publish(ChangeKind::Deleted, EntityKind::View, view_id, viewer, Some(page_id));
        }
        for page_id in removed.pages {
            self.changes
                .publish(ChangeKind::Deleted, EntityKind::Page, page_id, viewer, None);
        }
        Ok(())
    }
}
