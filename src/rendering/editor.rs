// Editor dispatch - documents open as text, database pages as a grid

use serde::Serialize;

use crate::core::{ItemId, PageId};
use crate::error::AppResult;
use crate::infrastructure::viewer::ViewerContext;
use crate::models::{ColumnDefinition, Item, Page, PageType, View};
use crate::services::{DatabaseService, PageService};

use super::field_render::{display_field, field_input, FieldDisplay, FieldInput};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "editor", rename_all = "camelCase")]
pub enum EditorView {
    #[serde(rename_all = "camelCase")]
    Document {
        page_id: PageId,
        title: String,
        content: String,
    },
    #[serde(rename_all = "camelCase")]
    Database {
        page_id: PageId,
        title: String,
        columns: Vec<ColumnDefinition>,
        rows: Vec<GridRow>,
        views: Vec<View>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridRow {
    pub item_id: ItemId,
    /// One cell per column, in schema order
    pub cells: Vec<GridCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GridCell {
    pub display: FieldDisplay,
    pub input: FieldInput,
}

pub fn grid_row(columns: &[ColumnDefinition], item: &Item) -> GridRow {
    GridRow {
        item_id: item.id,
        cells: columns
            .iter()
            .map(|column| {
                let value = item.fields.get(&column.name);
                GridCell {
                    display: display_field(column, value),
                    input: field_input(column, value),
                }
            })
            .collect(),
    }
}

pub fn document_editor(page: &Page) -> EditorView {
    EditorView::Document {
        page_id: page.id,
        title: page.title.clone(),
        content: page.content.clone(),
    }
}

pub fn database_editor(page: &Page, items: &[Item], views: Vec<View>) -> EditorView {
    let columns = page.columns().to_vec();
    let rows = items.iter().map(|item| grid_row(&columns, item)).collect();
    EditorView::Database {
        page_id: page.id,
        title: page.title.clone(),
        columns,
        rows,
        views,
    }
}

/// `None` when the page is missing or not the caller's
pub async fn open_editor(
    pages: &PageService,
    databases: &DatabaseService,
    vc: &ViewerContext,
    id: PageId,
) -> AppResult<Option<EditorView>> {
    let Some(page) = pages.get(vc, id).await? else {
        return Ok(None);
    };

    let editor = match page.page_type {
        PageType::Document => document_editor(&page),
        PageType::Database => {
            let items = databases.get_items(vc, page.id).await?;
            let views = databases.get_views(vc, page.id).await?;
            database_editor(&page, &items, views)
        }
    };
    Ok(Some(editor))
}
