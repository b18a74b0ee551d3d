use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde_json::Value as JsonValue;

/// Wire data types understood by the TDS protocol.
///
/// A `WireType` tags how a parameter value is serialized on the wire. It is
/// either given explicitly by the caller or inferred from the value's runtime
/// shape via [`infer_wire_type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// NULL, used for missing values and empty arrays
    Null,
    /// Boolean bit
    Bit,
    /// 64-bit integer
    BigInt,
    /// Floating point number
    Real,
    /// Calendar date without time
    Date,
    /// Time of day, optionally with a numeric offset
    Time,
    /// Date and time without a timezone offset
    DateTime2,
    /// Date and time with a timezone offset
    DateTimeOffset,
    /// Unicode text
    NVarChar,
    /// Raw binary data; also the fallback when nothing else fits
    VarBinary,
}

impl WireType {
    /// The native name of this wire type.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            WireType::Null => "null",
            WireType::Bit => "bit",
            WireType::BigInt => "bigint",
            WireType::Real => "real",
            WireType::Date => "date",
            WireType::Time => "time",
            WireType::DateTime2 => "datetime2",
            WireType::DateTimeOffset => "datetimeoffset",
            WireType::NVarChar => "nvarchar",
            WireType::VarBinary => "varbinary",
        }
    }

    /// Map a generic type name to a concrete wire type.
    ///
    /// Accepts the generic vocabulary (`integer`, `float`, `boolean`, `text`,
    /// `date`, `datetime`, `time`, `binary` and their aliases) as well as the
    /// native wire-type names, case-insensitively. Unrecognized names fall
    /// back to [`WireType::VarBinary`].
    #[must_use]
    pub fn from_name(name: &str) -> WireType {
        match name.to_ascii_lowercase().as_str() {
            "integer" | "int" | "bigint" => WireType::BigInt,
            "float" | "real" => WireType::Real,
            "boolean" | "bool" | "bit" => WireType::Bit,
            "text" | "string" | "nvarchar" => WireType::NVarChar,
            "date" => WireType::Date,
            "datetime" | "datetime2" => WireType::DateTime2,
            "datetimeoffset" => WireType::DateTimeOffset,
            "time" => WireType::Time,
            "null" => WireType::Null,
            _ => WireType::VarBinary,
        }
    }
}

/// Values that can be bound as query parameters or read out of a result row.
///
/// One enum covers both directions so helpers never need to branch on driver
/// types:
/// ```rust
/// use mssql_adapter::SqlValue;
///
/// let params = vec![
///     SqlValue::Int(1),
///     SqlValue::Text("alice".into()),
///     SqlValue::Bool(true),
/// ];
/// # let _ = params;
/// ```
///
/// An `Array` value is never bound directly; the query rewriter expands it
/// into one synthesized named parameter per element.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// NULL value
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// JSON value, serialized as text on the wire
    Json(JsonValue),
    /// Array value, expanded by the rewriter into multiple parameters
    Array(Vec<SqlValue>),
}

impl SqlValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let SqlValue::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let SqlValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let SqlValue::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let SqlValue::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let SqlValue::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        if let SqlValue::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// The textual form used by the type-inference cascade. Values with no
    /// meaningful textual form (binary data) return `None`.
    fn to_text(&self) -> Option<String> {
        match self {
            SqlValue::Int(i) => Some(i.to_string()),
            SqlValue::Float(f) => Some(f.to_string()),
            SqlValue::Text(s) => Some(s.clone()),
            SqlValue::Json(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Int(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Int(i64::from(value))
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Float(value)
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        SqlValue::Bytes(value)
    }
}

impl From<NaiveDateTime> for SqlValue {
    fn from(value: NaiveDateTime) -> Self {
        SqlValue::Timestamp(value)
    }
}

/// Textual patterns tried in order against a value's textual form.
/// The order is the priority: the first matching entry wins.
static TEXT_PATTERNS: LazyLock<Vec<(Regex, WireType)>> = LazyLock::new(|| {
    [
        (r"^-?\d+$", WireType::BigInt),
        (r"^\d+\.\d+$", WireType::Real),
        (r"^\d{4}-\d{2}-\d{2}$", WireType::Date),
        (r"^\d{2}:\d{2}(:\d{2})?([+-]\d{4})?$", WireType::Time),
        (
            r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?$",
            WireType::DateTime2,
        ),
        (
            r"^\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}(:\d{2}(\.\d+)?)?(Z|[+-]\d{2}:?\d{2})$",
            WireType::DateTimeOffset,
        ),
    ]
    .into_iter()
    .map(|(pattern, ty)| {
        let re = Regex::new(pattern).expect("hand-checked pattern");
        (re, ty)
    })
    .collect()
});

/// Infer the wire type for a parameter value from its runtime shape.
///
/// Rules, in fixed priority order (first match wins):
/// 1. NULL maps to [`WireType::Null`].
/// 2. Booleans map to [`WireType::Bit`].
/// 3. Arrays take the type of their first element; an empty array is NULL.
/// 4. Timestamps map to [`WireType::DateTimeOffset`].
/// 5. Everything else is converted to text and run through an ordered pattern
///    list: integer, decimal, date, time, datetime without offset, datetime
///    with offset; any other non-empty text is [`WireType::NVarChar`].
/// 6. Values with no textual form (binary) and empty text fall back to
///    [`WireType::VarBinary`].
///
/// Pure function, no side effects.
#[must_use]
pub fn infer_wire_type(value: &SqlValue) -> WireType {
    match value {
        SqlValue::Null => WireType::Null,
        SqlValue::Bool(_) => WireType::Bit,
        SqlValue::Array(items) => items
            .first()
            .map(infer_wire_type)
            .unwrap_or(WireType::Null),
        SqlValue::Timestamp(_) => WireType::DateTimeOffset,
        other => match other.to_text() {
            Some(text) if !text.is_empty() => {
                for (re, ty) in TEXT_PATTERNS.iter() {
                    if re.is_match(&text) {
                        return *ty;
                    }
                }
                WireType::NVarChar
            }
            _ => WireType::VarBinary,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn infers_scalars_by_shape() {
        assert_eq!(infer_wire_type(&SqlValue::Null), WireType::Null);
        assert_eq!(infer_wire_type(&SqlValue::Bool(true)), WireType::Bit);
        assert_eq!(infer_wire_type(&SqlValue::Int(42)), WireType::BigInt);
        assert_eq!(infer_wire_type(&SqlValue::Int(-7)), WireType::BigInt);
        assert_eq!(infer_wire_type(&SqlValue::Float(1.5)), WireType::Real);
        assert_eq!(
            infer_wire_type(&SqlValue::Bytes(vec![0xde, 0xad])),
            WireType::VarBinary
        );
    }

    #[test]
    fn infers_from_text_patterns() {
        assert_eq!(
            infer_wire_type(&SqlValue::Text("123".into())),
            WireType::BigInt
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("-123".into())),
            WireType::BigInt
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("3.25".into())),
            WireType::Real
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("2024-01-15".into())),
            WireType::Date
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("13:45".into())),
            WireType::Time
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("13:45:30+0200".into())),
            WireType::Time
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("2024-01-15 13:45:30".into())),
            WireType::DateTime2
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("2024-01-15T13:45:30.123".into())),
            WireType::DateTime2
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("2024-01-15 13:45:30+02:00".into())),
            WireType::DateTimeOffset
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("2024-01-15T13:45:30Z".into())),
            WireType::DateTimeOffset
        );
        assert_eq!(
            infer_wire_type(&SqlValue::Text("hello".into())),
            WireType::NVarChar
        );
    }

    #[test]
    fn empty_text_falls_back_to_binary() {
        assert_eq!(
            infer_wire_type(&SqlValue::Text(String::new())),
            WireType::VarBinary
        );
    }

    #[test]
    fn arrays_take_the_first_element_type() {
        let arr = SqlValue::Array(vec![SqlValue::Int(1), SqlValue::Text("x".into())]);
        assert_eq!(infer_wire_type(&arr), WireType::BigInt);
        assert_eq!(
            infer_wire_type(&SqlValue::Array(Vec::new())),
            WireType::Null
        );
    }

    #[test]
    fn timestamps_map_to_datetimeoffset() {
        let dt = NaiveDateTime::parse_from_str("2024-01-15 13:45:30", "%Y-%m-%d %H:%M:%S")
            .expect("valid timestamp");
        assert_eq!(
            infer_wire_type(&SqlValue::Timestamp(dt)),
            WireType::DateTimeOffset
        );
    }

    #[test]
    fn json_goes_through_the_text_cascade() {
        assert_eq!(infer_wire_type(&SqlValue::Json(json!(42))), WireType::BigInt);
        assert_eq!(
            infer_wire_type(&SqlValue::Json(json!({"a": 1}))),
            WireType::NVarChar
        );
    }

    #[test]
    fn maps_generic_type_names() {
        assert_eq!(WireType::from_name("integer"), WireType::from_name("int"));
        assert_eq!(WireType::from_name("float"), WireType::Real);
        assert_eq!(WireType::from_name("BOOLEAN"), WireType::Bit);
        assert_eq!(WireType::from_name("string"), WireType::NVarChar);
        assert_eq!(WireType::from_name("datetimeoffset"), WireType::DateTimeOffset);
        assert_eq!(WireType::from_name("unknown"), WireType::VarBinary);
    }
}
