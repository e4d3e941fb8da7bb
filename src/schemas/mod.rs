// Schema definitions for database pages

pub mod column_schema;

pub use column_schema::{
    append_column, default_database_schema, parse_date, validate_fields, validate_value,
    FieldValidation,
};
