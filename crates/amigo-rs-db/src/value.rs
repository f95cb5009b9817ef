//! Statement parameters and result cells.
//!
//! The ledger binds a migration name and a priority and reads back a name,
//! a priority and a timestamp, so [`Value`] only carries those shapes plus
//! SQL NULL.

use chrono::NaiveDateTime;

/// A parameter sent to, or a cell read from, a driver.
///
/// # Examples
///
/// ```
/// use amigo_rs_db::value::Value;
///
/// assert_eq!(Value::from(3_i64), Value::Int(3));
/// assert_eq!(Value::from("a.sql"), Value::Text("a.sql".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// SQL NULL.
    Null,
    /// An integer column (priorities, counts, surrogate keys).
    Int(i64),
    /// A text column. Drivers that speak a text protocol put every cell here.
    Text(String),
    /// A timestamp without time zone.
    Timestamp(NaiveDateTime),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl Value {
    /// Returns the integer, if this is an `Int`.
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the text, if this is a `Text`.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_params() {
        assert_eq!(Value::from(7_i64), Value::Int(7));
        assert_eq!(Value::from("b.sql"), Value::Text("b.sql".into()));
        assert_eq!(Value::from(String::from("c.sql")), Value::Text("c.sql".into()));
    }

    #[test]
    fn test_timestamp() {
        let dt = chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        assert_eq!(Value::from(dt), Value::Timestamp(dt));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Int(42).as_int(), Some(42));
        assert_eq!(Value::Null.as_int(), None);
        assert_eq!(Value::Text("a".into()).as_text(), Some("a"));
        assert_eq!(Value::Int(1).as_text(), None);
    }
}
