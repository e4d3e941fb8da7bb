use serde::{Deserialize, Serialize};

use crate::core::{PageId, UserId, ViewId};

pub const DEFAULT_VIEW_NAME: &str = "Table View";

/// A saved display configuration for a database page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub id: ViewId,
    pub page_id: PageId,
    pub owner_id: UserId,
    pub name: String,
    #[serde(rename = "type")]
    pub view_type: ViewType,
    #[serde(default)]
    pub config: ViewConfig,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewType {
    Table,
    List,
    Gallery,
    Calendar,
    Kanban,
}

/// Display hints only; nothing evaluates them server-side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kanban_field: Option<String>,
}

impl ViewConfig {
    pub fn is_empty(&self) -> bool {
        *self == ViewConfig::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_serializes_to_empty_object() {
        let json = serde_json::to_value(ViewConfig::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }
}
