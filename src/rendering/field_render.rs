// Field rendering - per column type, what an editor shows and what a cell displays

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::{ColumnDefinition, ColumnType, FieldValue, SelectOption};
use crate::schemas::parse_date;

/// Shown for missing and null values
pub const PLACEHOLDER: &str = "-";

/// Shown for date values that do not parse
pub const INVALID_DATE: &str = "Invalid Date";

const BADGE_ALPHA: &str = "20";

static HEX6: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#[0-9a-fA-F]{6}$").unwrap());
static HEX3: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#([0-9a-fA-F])([0-9a-fA-F])([0-9a-fA-F])$").unwrap());

/// A colored label for a matched choice
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub label: String,
    pub color: String,
    pub background: String,
}

impl Badge {
    pub fn for_option(option: &SelectOption) -> Self {
        Self {
            label: option.label.clone(),
            color: option.color.clone(),
            background: badge_background(&option.color),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DisplayPart {
    Text { text: String },
    Badge(Badge),
}

impl DisplayPart {
    fn text(text: impl Into<String>) -> Self {
        DisplayPart::Text { text: text.into() }
    }

    pub fn as_text(&self) -> &str {
        match self {
            DisplayPart::Text { text } => text,
            DisplayPart::Badge(badge) => &badge.label,
        }
    }
}

/// Read-only rendering of one cell
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDisplay {
    pub parts: Vec<DisplayPart>,
}

impl FieldDisplay {
    fn single(part: DisplayPart) -> Self {
        Self { parts: vec![part] }
    }

    pub fn placeholder() -> Self {
        Self::single(DisplayPart::text(PLACEHOLDER))
    }

    /// Visible text with badges flattened to their labels
    pub fn plain_text(&self) -> String {
        self.parts
            .iter()
            .map(DisplayPart::as_text)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn badges(&self) -> impl Iterator<Item = &Badge> {
        self.parts.iter().filter_map(|part| match part {
            DisplayPart::Badge(badge) => Some(badge),
            DisplayPart::Text { .. } => None,
        })
    }
}

/// Translucent background behind a badge: the color plus an alpha suffix.
/// Non-hex colors are passed through unchanged.
pub fn badge_background(color: &str) -> String {
    if HEX6.is_match(color) {
        return format!("{}{}", color, BADGE_ALPHA);
    }
    if let Some(caps) = HEX3.captures(color) {
        return format!(
            "#{r}{r}{g}{g}{b}{b}{alpha}",
            r = &caps[1],
            g = &caps[2],
            b = &caps[3],
            alpha = BADGE_ALPHA
        );
    }
    color.to_string()
}

pub fn display_field(column: &ColumnDefinition, value: Option<&FieldValue>) -> FieldDisplay {
    let value = match value {
        None | Some(FieldValue::Null) => return FieldDisplay::placeholder(),
        Some(value) => value,
    };

    match column.column_type {
        ColumnType::Text | ColumnType::Number => FieldDisplay::single(DisplayPart::text(raw_text(value))),
        ColumnType::Date => FieldDisplay::single(DisplayPart::text(display_date(value))),
        ColumnType::Select | ColumnType::Status => match value {
            FieldValue::Text(label) => FieldDisplay::single(choice_part(column, label)),
            other => FieldDisplay::single(DisplayPart::text(raw_text(other))),
        },
        ColumnType::Multiselect => match value {
            FieldValue::Labels(labels) => FieldDisplay {
                parts: labels.iter().map(|label| choice_part(column, label)).collect(),
            },
            other => FieldDisplay::single(DisplayPart::text(raw_text(other))),
        },
    }
}

fn choice_part(column: &ColumnDefinition, label: &str) -> DisplayPart {
    match column.option(label) {
        Some(option) => DisplayPart::Badge(Badge::for_option(option)),
        None => DisplayPart::text(label),
    }
}

fn display_date(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => parse_date(s)
            .map(|date| date.format("%-m/%-d/%Y").to_string())
            .unwrap_or_else(|| INVALID_DATE.to_string()),
        _ => INVALID_DATE.to_string(),
    }
}

fn raw_text(value: &FieldValue) -> String {
    match value {
        FieldValue::Null => PLACEHOLDER.to_string(),
        FieldValue::Text(s) => s.clone(),
        FieldValue::Number(n) => format_number(*n),
        FieldValue::Labels(labels) => labels.join(", "),
    }
}

/// Integral values print without a fractional part
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Text,
    Number,
    Date,
    Select,
    Multiselect,
}

/// What an editor control for one cell needs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldInput {
    pub name: String,
    pub kind: InputKind,
    /// Current value in the control's own format
    pub value: FieldValue,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

pub fn field_input(column: &ColumnDefinition, value: Option<&FieldValue>) -> FieldInput {
    let kind = match column.column_type {
        ColumnType::Text => InputKind::Text,
        ColumnType::Number => InputKind::Number,
        ColumnType::Date => InputKind::Date,
        ColumnType::Select | ColumnType::Status => InputKind::Select,
        ColumnType::Multiselect => InputKind::Multiselect,
    };

    let value = match (kind, value) {
        (InputKind::Multiselect, Some(FieldValue::Labels(labels))) => FieldValue::Labels(labels.clone()),
        (InputKind::Multiselect, _) => FieldValue::Labels(Vec::new()),
        (InputKind::Number, Some(FieldValue::Number(n))) => FieldValue::Number(*n),
        (_, None | Some(FieldValue::Null)) => FieldValue::Text(String::new()),
        (_, Some(other)) => FieldValue::Text(raw_text(other)),
    };

    FieldInput {
        name: column.name.clone(),
        kind,
        value,
        options: column.options.clone().unwrap_or_default(),
    }
}

/// Raw value coming back from an editor control
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawInput {
    Text(String),
    Choices(Vec<String>),
}

/// Turn editor input into a stored value. Empty input clears the field.
pub fn parse_input(column: &ColumnDefinition, raw: RawInput) -> AppResult<FieldValue> {
    match (column.column_type, raw) {
        (ColumnType::Multiselect, RawInput::Choices(labels)) => Ok(FieldValue::Labels(labels)),
        (ColumnType::Multiselect, RawInput::Text(label)) if label.is_empty() => Ok(FieldValue::Labels(Vec::new())),
        (ColumnType::Multiselect, RawInput::Text(label)) => Ok(FieldValue::Labels(vec![label])),
        (_, RawInput::Choices(_)) => Err(AppError::Validation(format!(
            "field '{}' takes a single value",
            column.name
        ))),
        (ColumnType::Text, RawInput::Text(text)) => Ok(FieldValue::Text(text)),
        (_, RawInput::Text(text)) if text.trim().is_empty() => Ok(FieldValue::Null),
        (ColumnType::Number, RawInput::Text(text)) => match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(FieldValue::Number(n)),
            _ => Err(AppError::Validation(format!(
                "field '{}' expects a number, got '{}'",
                column.name, text
            ))),
        },
        (ColumnType::Date, RawInput::Text(text)) => match parse_date(&text) {
            Some(date) => Ok(FieldValue::Text(date.format("%Y-%m-%d").to_string())),
            None => Err(AppError::Validation(format!(
                "field '{}' expects a date, got '{}'",
                column.name, text
            ))),
        },
        (ColumnType::Select | ColumnType::Status, RawInput::Text(label)) => Ok(FieldValue::Text(label)),
    }
}
