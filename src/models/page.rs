use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::{PageId, UserId};

/// A node in the user's page tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: PageId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<PageId>,
    pub owner_id: UserId,
    #[serde(rename = "type", default)]
    pub page_type: PageType,
    /// Only present on database pages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Vec<ColumnDefinition>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Page {
    pub fn is_database(&self) -> bool {
        self.page_type == PageType::Database
    }

    /// Columns of a database page; empty for documents
    pub fn columns(&self) -> &[ColumnDefinition] {
        match (&self.page_type, &self.schema) {
            (PageType::Database, Some(schema)) => schema,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    #[default]
    Document,
    Database,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageType::Document => "document",
            PageType::Database => "database",
        }
    }

    /// Stored rows written before page types existed carry no type at all
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            Some("database") => PageType::Database,
            _ => PageType::Document,
        }
    }
}

/// Partial update for a page; `None` leaves the field untouched
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl PageUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

/// One typed column of a database page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<SelectOption>>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            options: None,
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = Some(options);
        self
    }

    /// Options only belong to choice columns, and an empty list is the same as none
    pub fn normalized(mut self) -> Self {
        let keep = self.column_type.is_choice()
            && self.options.as_ref().map_or(false, |opts| !opts.is_empty());
        if !keep {
            self.options = None;
        }
        self
    }

    pub fn option(&self, label: &str) -> Option<&SelectOption> {
        self.options
            .as_deref()
            .unwrap_or_default()
            .iter()
            .find(|o| o.label == label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Select,
    Multiselect,
    Status,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Date => "date",
            ColumnType::Select => "select",
            ColumnType::Multiselect => "multiselect",
            ColumnType::Status => "status",
        }
    }

    /// Columns whose values are picked from `options`
    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            ColumnType::Select | ColumnType::Multiselect | ColumnType::Status
        )
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A choice for select-like columns. The label is what items store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub color: String,
}

impl SelectOption {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_page_type_reads_as_document() {
        let page: Page = serde_json::from_value(json!({
            "id": "1",
            "title": "Legacy",
            "content": "",
            "ownerId": "9",
            "createdAt": 0,
            "updatedAt": 0
        }))
        .unwrap();
        assert_eq!(page.page_type, PageType::Document);
        assert!(page.columns().is_empty());
    }

    #[test]
    fn normalized_drops_options_on_plain_columns() {
        let column = ColumnDefinition::new("Name", ColumnType::Text)
            .with_options(vec![SelectOption::new("x", "#000000")])
            .normalized();
        assert_eq!(column.options, None);

        let empty = ColumnDefinition::new("Tags", ColumnType::Multiselect)
            .with_options(vec![])
            .normalized();
        assert_eq!(empty.options, None);

        let status = ColumnDefinition::new("State", ColumnType::Status)
            .with_options(vec![SelectOption::new("Done", "#00ff00")])
            .normalized();
        assert_eq!(status.options.map(|o| o.len()), Some(1));
    }

    #[test]
    fn column_wire_format_uses_type_key() {
        let column: ColumnDefinition = serde_json::from_value(json!({
            "name": "Priority",
            "type": "select",
            "options": [{"label": "Low", "color": "#00ff00"}]
        }))
        .unwrap();
        assert_eq!(column.column_type, ColumnType::Select);
        assert_eq!(column.option("Low").map(|o| o.color.as_str()), Some("#00ff00"));
        assert!(serde_json::from_value::<ColumnDefinition>(json!({
            "name": "Bad",
            "type": "checkbox"
        }))
        .is_err());
    }
}
