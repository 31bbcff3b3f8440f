//! Core value types shared by every stage of the engine.

pub mod data_type;
pub mod descriptor;
pub mod value;

pub use data_type::DataType;
pub use descriptor::{PropertyDescriptor, SYSTEM_PROPERTY_IDS, category_only_properties};
pub use value::{
    FieldValue, FormData, PreviousValues, Scalar, SlotMap, SlotMaps, form_data_from_json,
};

use serde_json::Value as JsonValue;

/// `true` for a non-empty string of ASCII digits.
#[must_use]
pub fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Read an identifier that may arrive as a JSON string or number.
///
/// Strings are trimmed; blank ids and other JSON types yield `None`.
#[must_use]
pub fn json_id(value: &JsonValue) -> Option<String> {
    let id = match value {
        JsonValue::String(s) => s.trim().to_string(),
        JsonValue::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

/// Loose boolean read: `true`, non-zero numbers, and non-empty strings other
/// than `"false"`/`"0"`.
pub(crate) fn json_bool(value: &JsonValue) -> bool {
    match value {
        JsonValue::Bool(b) => *b,
        JsonValue::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        JsonValue::String(s) => !s.is_empty() && s != "false" && s != "0",
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digits_detection() {
        assert!(is_all_digits("0159"));
        assert!(!is_all_digits(""));
        assert!(!is_all_digits("15a"));
        assert!(!is_all_digits("-1"));
    }

    #[test]
    fn ids_accept_strings_and_numbers() {
        assert_eq!(json_id(&json!(" 42 ")), Some("42".into()));
        assert_eq!(json_id(&json!(42)), Some("42".into()));
        assert_eq!(json_id(&json!("")), None);
        assert_eq!(json_id(&json!(null)), None);
    }
}
