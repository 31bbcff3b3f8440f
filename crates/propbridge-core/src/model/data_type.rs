use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Declared value type of a document property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataType {
    #[default]
    String,
    Number,
    Decimal,
    Integer,
    Date,
    DateTime,
    Boolean,
    KeyValue,
}

impl DataType {
    pub const ALL: [Self; 8] = [
        Self::String,
        Self::Number,
        Self::Decimal,
        Self::Integer,
        Self::Date,
        Self::DateTime,
        Self::Boolean,
        Self::KeyValue,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Decimal => "DECIMAL",
            Self::Integer => "INTEGER",
            Self::Date => "DATE",
            Self::DateTime => "DATETIME",
            Self::Boolean => "BOOLEAN",
            Self::KeyValue => "KEYVALUE",
        }
    }

    /// `true` for the three number-like types.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        matches!(self, Self::Number | Self::Decimal | Self::Integer)
    }

    /// Map the on-premise `storedoctype` numeric type code.
    ///
    /// Codes 6-8 (and anything unknown) are text-like and become `STRING`.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Number,
            2 => Self::Decimal,
            3 => Self::DateTime,
            4 => Self::Date,
            5 => Self::KeyValue,
            _ => Self::String,
        }
    }

    /// Case-insensitive parse that never fails; unknown names become `STRING`.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        raw.parse().unwrap_or_default()
    }

    /// Read a data type from a raw JSON value (name, numeric code, or absent).
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => Self::parse_lenient(s),
            serde_json::Value::Number(n) => n.as_i64().map_or(Self::String, Self::from_code),
            _ => Self::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a data type name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseDataTypeError {
    pub got: String,
}

impl fmt::Display for ParseDataTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid data type: '{}'", self.got)
    }
}

impl std::error::Error for ParseDataTypeError {}

impl FromStr for DataType {
    type Err = ParseDataTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|dt| dt.as_str() == normalized)
            .ok_or_else(|| ParseDataTypeError { got: s.to_string() })
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&raw))
    }
}
