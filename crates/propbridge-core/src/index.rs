//! Multi-key value lookup table.
//!
//! A value can be reachable under a numeric id, a UUID, and one or more
//! aliases (`property_<id>` or a system name). Each key is routed to exactly
//! one of three named maps by its shape, so reads behave like one flat map
//! while it stays visible why a key exists.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::id_map::IdMap;
use crate::model::{FieldValue, SYSTEM_PROPERTY_IDS, is_all_digits};

/// Prefix used by the on-premise variant and the search index for aliases.
pub const PROPERTY_PREFIX: &str = "property_";

/// Synthetic key for the document id.
pub const DOCUMENT_ID: &str = "DOCUMENT_ID";

/// Synthetic key for the category id.
pub const CATEGORY: &str = "CATEGORY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyKind {
    NumericId,
    Uuid,
    Alias,
}

fn classify(key: &str) -> KeyKind {
    if is_all_digits(key) {
        KeyKind::NumericId
    } else if key.starts_with(PROPERTY_PREFIX) || SYSTEM_PROPERTY_IDS.contains(&key) {
        KeyKind::Alias
    } else {
        KeyKind::Uuid
    }
}

/// `property_<key>`.
#[must_use]
pub fn prefixed(key: &str) -> String {
    format!("{PROPERTY_PREFIX}{key}")
}

/// Values of one source document under all their keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValueIndex {
    by_numeric_id: BTreeMap<String, FieldValue>,
    by_uuid: BTreeMap<String, FieldValue>,
    by_alias: BTreeMap<String, FieldValue>,
}

impl ValueIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn map_for(&self, key: &str) -> &BTreeMap<String, FieldValue> {
        match classify(key) {
            KeyKind::NumericId => &self.by_numeric_id,
            KeyKind::Uuid => &self.by_uuid,
            KeyKind::Alias => &self.by_alias,
        }
    }

    fn map_for_mut(&mut self, key: &str) -> &mut BTreeMap<String, FieldValue> {
        match classify(key) {
            KeyKind::NumericId => &mut self.by_numeric_id,
            KeyKind::Uuid => &mut self.by_uuid,
            KeyKind::Alias => &mut self.by_alias,
        }
    }

    /// Insert or overwrite. Blank keys are ignored.
    pub fn insert(&mut self, key: &str, value: FieldValue) {
        let key = key.trim();
        if key.is_empty() {
            return;
        }
        self.map_for_mut(key).insert(key.to_string(), value);
    }

    /// Insert only when the key has no value yet.
    pub fn insert_if_absent(&mut self, key: &str, value: FieldValue) {
        if !self.contains_key(key.trim()) {
            self.insert(key, value);
        }
    }

    /// Direct hit on exactly this key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.map_for(key).get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_numeric_id.len() + self.by_uuid.len() + self.by_alias.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.by_numeric_id
            .iter()
            .chain(&self.by_uuid)
            .chain(&self.by_alias)
            .map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub const fn by_numeric_id(&self) -> &BTreeMap<String, FieldValue> {
        &self.by_numeric_id
    }

    #[must_use]
    pub const fn by_uuid(&self) -> &BTreeMap<String, FieldValue> {
        &self.by_uuid
    }

    #[must_use]
    pub const fn by_alias(&self) -> &BTreeMap<String, FieldValue> {
        &self.by_alias
    }

    /// Value under `key` or its `property_` alias.
    fn get_or_prefixed(&self, key: &str) -> Option<&FieldValue> {
        self.get(key).or_else(|| self.get(&prefixed(key)))
    }

    /// Resolve `key` through the full fallback chain:
    ///
    /// 1. direct key
    /// 2. numeric id reverse-mapped from the UUID (and its `property_` alias)
    /// 3. the `property_` alias of an all-digit key
    /// 4. legacy aliases of `DOCUMENT_ID` / `CATEGORY`
    /// 5. the `property_` alias of any other key
    #[must_use]
    pub fn lookup(&self, key: &str, id_map: &IdMap) -> Option<&FieldValue> {
        self.get(key)
            .or_else(|| {
                id_map
                    .numeric_id_for(key)
                    .and_then(|num| self.get_or_prefixed(num))
            })
            .or_else(|| {
                is_all_digits(key)
                    .then(|| self.get(&prefixed(key)))
                    .flatten()
            })
            .or_else(|| self.legacy_alias(key))
            .or_else(|| {
                (!key.starts_with(PROPERTY_PREFIX))
                    .then(|| self.get(&prefixed(key)))
                    .flatten()
            })
    }

    /// `DOCUMENT_ID` / `CATEGORY` via their `property_*` spelling.
    pub(crate) fn legacy_alias(&self, key: &str) -> Option<&FieldValue> {
        match key {
            DOCUMENT_ID => self
                .get("property_document_id")
                .or_else(|| self.get(DOCUMENT_ID)),
            CATEGORY => self.get("property_category").or_else(|| self.get(CATEGORY)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::from(s)
    }

    #[test]
    fn keys_route_by_shape() {
        let mut idx = ValueIndex::new();
        idx.insert("159", text("a"));
        idx.insert("uuid-159", text("b"));
        idx.insert("property_159", text("c"));
        idx.insert("DOCUMENT_ID", text("d"));
        idx.insert("  ", text("ignored"));

        assert_eq!(idx.by_numeric_id().len(), 1);
        assert_eq!(idx.by_uuid().len(), 1);
        assert_eq!(idx.by_alias().len(), 2);
        assert_eq!(idx.len(), 4);
        assert_eq!(idx.get("property_159"), Some(&text("c")));
    }

    #[test]
    fn insert_if_absent_never_overwrites() {
        let mut idx = ValueIndex::new();
        idx.insert("FILE_NAME", text("direct"));
        idx.insert_if_absent("FILE_NAME", text("alias"));
        assert_eq!(idx.get("FILE_NAME"), Some(&text("direct")));
    }

    #[test]
    fn lookup_reverse_maps_uuid_to_numeric() {
        let mut idx = ValueIndex::new();
        idx.insert("property_42", text("v"));
        let id_map: IdMap = [("42".to_string(), "uuid-42".to_string())]
            .into_iter()
            .collect();
        assert_eq!(idx.lookup("uuid-42", &id_map), Some(&text("v")));
        assert_eq!(idx.lookup("42", &IdMap::new()), Some(&text("v")));
    }

    #[test]
    fn lookup_legacy_aliases() {
        let mut idx = ValueIndex::new();
        idx.insert("property_document_id", text("D1"));
        idx.insert("property_category", text("C1"));
        idx.insert("property_custom", text("X"));
        let none = IdMap::new();
        assert_eq!(idx.lookup(DOCUMENT_ID, &none), Some(&text("D1")));
        assert_eq!(idx.lookup(CATEGORY, &none), Some(&text("C1")));
        assert_eq!(idx.lookup("custom", &none), Some(&text("X")));
        assert_eq!(idx.lookup("missing", &none), None);
    }
}
