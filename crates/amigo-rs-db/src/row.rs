//! Result rows and typed column access.

use amigo_rs_core::AmigoError;
use chrono::NaiveDateTime;

use crate::value::Value;

/// One result row: column names and the cells under them.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Panics
    ///
    /// Panics if the number of columns does not match the number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        assert_eq!(
            columns.len(),
            values.len(),
            "Row column count must match value count"
        );
        Self { columns, values }
    }

    /// Gets a typed value by column name.
    ///
    /// Column names are matched case-insensitively; some drivers upper-case
    /// unquoted identifiers.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> Result<T, AmigoError> {
        let idx = self
            .columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .ok_or_else(|| {
                AmigoError::DatabaseError(format!("Column '{column}' not found in row"))
            })?;
        T::from_value(&self.values[idx])
    }
}

/// Conversion from a [`Value`] cell to a Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> Result<Self, AmigoError>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, AmigoError> {
        match value {
            Value::Int(i) => Ok(*i),
            // The MySQL text protocol returns every column as text.
            Value::Text(s) => s
                .trim()
                .parse()
                .map_err(|e| AmigoError::DatabaseError(format!("Invalid integer '{s}': {e}"))),
            _ => Err(AmigoError::DatabaseError(format!(
                "Expected an integer, got {value:?}"
            ))),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, AmigoError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            _ => Err(AmigoError::DatabaseError(format!(
                "Expected text, got {value:?}"
            ))),
        }
    }
}

/// Formats accepted when a timestamp arrives as text (SQLite stores
/// `CURRENT_TIMESTAMP` as `YYYY-MM-DD HH:MM:SS`).
const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

impl FromValue for NaiveDateTime {
    fn from_value(value: &Value) -> Result<Self, AmigoError> {
        match value {
            Value::Timestamp(dt) => Ok(*dt),
            Value::Text(s) => DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .ok_or_else(|| AmigoError::DatabaseError(format!("Invalid timestamp '{s}'"))),
            _ => Err(AmigoError::DatabaseError(format!(
                "Expected a timestamp, got {value:?}"
            ))),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, AmigoError> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}
