// Column schema of database pages and the field-value contract it implies

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AppError, AppResult};
use crate::models::{ColumnDefinition, ColumnType, FieldMap, FieldValue, SelectOption};

/// How strictly item fields are checked against the page schema on write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValidation {
    /// Store whatever the client sends
    #[default]
    Permissive,
    /// Reject values whose shape does not match their column
    Strict,
}

impl FromStr for FieldValidation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(FieldValidation::Permissive),
            "strict" => Ok(FieldValidation::Strict),
            other => Err(format!("unknown field validation mode '{}'", other)),
        }
    }
}

/// Schema offered by the "New Database" action
pub fn default_database_schema() -> Vec<ColumnDefinition> {
    vec![
        ColumnDefinition::new("Name", ColumnType::Text),
        ColumnDefinition::new("Status", ColumnType::Select).with_options(vec![
            SelectOption::new("Not Started", "#ff0000"),
            SelectOption::new("In Progress", "#ffaa00"),
            SelectOption::new("Done", "#00ff00"),
        ]),
        ColumnDefinition::new("Due Date", ColumnType::Date),
    ]
}

/// Append a column, keeping existing order. Names are not de-duplicated.
pub fn append_column(schema: Option<Vec<ColumnDefinition>>, column: ColumnDefinition) -> Vec<ColumnDefinition> {
    let mut columns = schema.unwrap_or_default();
    columns.push(column.normalized());
    columns
}

/// Accepts `YYYY-MM-DD` as well as full RFC 3339 timestamps
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// Check every key that names a schema column. Unknown keys pass through.
pub fn validate_fields(schema: &[ColumnDefinition], fields: &FieldMap, mode: FieldValidation) -> AppResult<()> {
    if mode == FieldValidation::Permissive {
        return Ok(());
    }

    for (name, value) in fields {
        // Duplicate column names are allowed; a value must satisfy one of them
        let candidates: Vec<&ColumnDefinition> = schema.iter().filter(|c| &c.name == name).collect();
        if candidates.is_empty() {
            continue;
        }
        let mut last_err = None;
        for column in candidates {
            match validate_value(column, value) {
                Ok(()) => {
                    last_err = None;
                    break;
                }
                Err(e) => last_err = Some(e),
            }
        }
        if let Some(err) = last_err {
            return Err(err);
        }
    }
    Ok(())
}

/// Check one value against one column
pub fn validate_value(column: &ColumnDefinition, value: &FieldValue) -> AppResult<()> {
    let mismatch = || {
        AppError::Validation(format!(
            "field '{}' expects a {} value, got {}",
            column.name,
            column.column_type,
            value.kind()
        ))
    };

    match (column.column_type, value) {
        (_, FieldValue::Null) => Ok(()),
        (ColumnType::Text, FieldValue::Text(_)) => Ok(()),
        (ColumnType::Number, FieldValue::Number(n)) if n.is_finite() => Ok(()),
        (ColumnType::Number, FieldValue::Number(_)) => Err(AppError::Validation(format!(
            "field '{}' must be a finite number",
            column.name
        ))),
        (ColumnType::Date, FieldValue::Text(s)) => {
            if parse_date(s).is_some() {
                Ok(())
            } else {
                Err(AppError::Validation(format!(
                    "field '{}' is not a valid date: '{}'",
                    column.name, s
                )))
            }
        }
        (ColumnType::Select | ColumnType::Status, FieldValue::Text(label)) => check_labels(column, [label]),
        (ColumnType::Multiselect, FieldValue::Labels(labels)) => check_labels(column, labels),
        _ => Err(mismatch()),
    }
}

fn check_labels<'a>(column: &ColumnDefinition, labels: impl IntoIterator<Item = &'a String>) -> AppResult<()> {
    // A choice column without options accepts any label
    if column.options.as_ref().map_or(true, |o| o.is_empty()) {
        return Ok(());
    }
    for label in labels {
        if label.is_empty() {
            continue;
        }
        if column.option(label).is_none() {
            return Err(AppError::Validation(format!(
                "'{}' is not an option of field '{}'",
                label, column.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board_schema() -> Vec<ColumnDefinition> {
        let mut schema = default_database_schema();
        schema.push(ColumnDefinition::new("Estimate", ColumnType::Number));
        schema.push(ColumnDefinition::new("Tags", ColumnType::Multiselect).with_options(vec![
            SelectOption::new("home", "#123456"),
            SelectOption::new("work", "#654321"),
        ]));
        schema
    }

    fn fields(pairs: &[(&str, FieldValue)]) -> FieldMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn append_keeps_order_and_duplicates() {
        let schema = append_column(Some(default_database_schema()), ColumnDefinition::new("Name", ColumnType::Text));
        let names: Vec<&str> = schema.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Name", "Status", "Due Date", "Name"]);
    }

    #[test]
    fn append_to_missing_schema_starts_fresh() {
        let schema = append_column(None, ColumnDefinition::new("Only", ColumnType::Date));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn permissive_accepts_anything() {
        let f = fields(&[("Estimate", FieldValue::Text("lots".into()))]);
        assert!(validate_fields(&board_schema(), &f, FieldValidation::Permissive).is_ok());
    }

    #[test]
    fn strict_accepts_matching_values_and_stale_keys() {
        let f = fields(&[
            ("Name", "Buy milk".into()),
            ("Status", "Done".into()),
            ("Due Date", "2024-03-01".into()),
            ("Estimate", FieldValue::Number(2.5)),
            ("Tags", FieldValue::Labels(vec!["home".into()])),
            ("Removed Column", FieldValue::Number(1.0)),
            ("Status", FieldValue::Null),
        ]);
        assert!(validate_fields(&board_schema(), &f, FieldValidation::Strict).is_ok());
    }

    #[test]
    fn strict_rejects_mismatches() {
        let schema = board_schema();
        let cases = [
            fields(&[("Estimate", "three".into())]),
            fields(&[("Status", "Blocked".into())]),
            fields(&[("Tags", FieldValue::Labels(vec!["garden".into()]))]),
            fields(&[("Due Date", "next tuesday".into())]),
            fields(&[("Name", FieldValue::Labels(vec![]))]),
            fields(&[("Estimate", FieldValue::Number(f64::NAN))]),
        ];
        for case in cases {
            let err = validate_fields(&schema, &case, FieldValidation::Strict).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{:?}", case);
        }
    }

    #[test]
    fn dates_accept_rfc3339() {
        assert_eq!(
            parse_date("2024-03-01T10:00:00Z"),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
        assert!(parse_date("03/01/2024").is_none());
    }

    #[test]
    fn validation_mode_parses() {
        assert_eq!("STRICT".parse::<FieldValidation>().unwrap(), FieldValidation::Strict);
        assert!("lenient".parse::<FieldValidation>().is_err());
    }
}
