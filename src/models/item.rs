use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::{ItemId, PageId, UserId};

/// Field values keyed by column name. Keys are not tied to the current schema.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One row of a database page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub page_id: PageId,
    pub owner_id: UserId,
    pub fields: FieldMap,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A single stored field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Number(f64),
    Labels(Vec<String>),
}

impl FieldValue {
    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Text(_) => "string",
            FieldValue::Number(_) => "number",
            FieldValue::Labels(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::Labels(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn field_values_decode_from_plain_json() {
        let fields: FieldMap = serde_json::from_value(json!({
            "Name": "Buy milk",
            "Estimate": 3,
            "Tags": ["home", "errand"],
            "Due Date": null
        }))
        .unwrap();

        assert_eq!(fields["Name"], FieldValue::Text("Buy milk".into()));
        assert_eq!(fields["Estimate"], FieldValue::Number(3.0));
        assert_eq!(
            fields["Tags"],
            FieldValue::Labels(vec!["home".into(), "errand".into()])
        );
        assert!(fields["Due Date"].is_null());
    }

    #[test]
    fn nested_objects_are_not_field_values() {
        assert!(serde_json::from_value::<FieldValue>(json!({"a": 1})).is_err());
        assert!(serde_json::from_value::<FieldValue>(json!([1, 2])).is_err());
    }
}
