//! The context a host page hands to an embedded editor.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::model::json_id;

/// Host-supplied payload: the document to edit and any properties the host
/// already knows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostData {
    pub doc_id: Option<JsonValue>,
    pub dms_properties: Map<String, JsonValue>,
}

/// `{ base, uiLocale, data: { docId, dmsProperties }, debug }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostContext {
    pub base: Option<String>,
    pub ui_locale: Option<String>,
    pub data: HostData,
    pub debug: bool,
}

impl HostContext {
    /// Lenient read: a malformed context degrades to the default.
    #[must_use]
    pub fn from_value(value: &JsonValue) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_else(|err| {
            tracing::warn!(error = %err, "host context malformed, ignoring it");
            Self::default()
        })
    }

    /// Document id from `data.docId`, which may be a bare id, a path or URL.
    #[must_use]
    pub fn document_id(&self) -> Option<String> {
        let raw = self.data.doc_id.as_ref().and_then(json_id)?;
        let id = extract_doc_id_from_any(&raw);
        (!id.is_empty()).then_some(id)
    }
}

/// First non-empty document id among several candidate parameters.
#[must_use]
pub fn resolve_doc_id<'a>(candidates: impl IntoIterator<Item = &'a str>) -> Option<String> {
    candidates
        .into_iter()
        .map(extract_doc_id_from_any)
        .find(|id| !id.is_empty())
}

/// Pull a document id out of a bare id, a `dmsObject:///...` reference, a
/// URL or path containing `/o2/{id}`, or any other URL/path (last segment).
#[must_use]
pub fn extract_doc_id_from_any(raw: &str) -> String {
    let s = raw.trim();
    if s.is_empty() {
        return String::new();
    }
    if !s.contains('/') && s.starts_with(|c: char| c.is_ascii_alphanumeric()) {
        return s.to_string();
    }

    let pathish = s.strip_prefix("dmsObject://").unwrap_or(s);
    if let Some(id) = after_o2_segment(pathish) {
        return id.to_string();
    }

    let without_authority = s
        .split_once("://")
        .map_or(s, |(_, rest)| rest.find('/').map_or("", |i| &rest[i..]));
    let path = without_authority
        .split(['?', '#'])
        .next()
        .unwrap_or_default();
    path.split('/')
        .rfind(|seg| !seg.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// The segment after the first `/o2/` (case-insensitive).
fn after_o2_segment(s: &str) -> Option<&str> {
    let lower = s.to_ascii_lowercase();
    let start = lower.find("/o2/")? + "/o2/".len();
    let rest = &s[start..];
    let end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let id = &rest[..end];
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bare_ids_pass_through() {
        assert_eq!(extract_doc_id_from_any(" A0001 "), "A0001");
        assert_eq!(extract_doc_id_from_any(""), "");
    }

    #[test]
    fn o2_paths_and_references() {
        assert_eq!(extract_doc_id_from_any("dmsObject:///dms/r/repo/o2/D123"), "D123");
        assert_eq!(
            extract_doc_id_from_any("https://host/dms/r/repo/O2/D9?x=1#frag"),
            "D9"
        );
        assert_eq!(extract_doc_id_from_any("/dms/r/repo/o2/D7/update"), "D7");
    }

    #[test]
    fn falls_back_to_last_segment() {
        assert_eq!(extract_doc_id_from_any("https://host/a/b/DOC42?q=1"), "DOC42");
        assert_eq!(extract_doc_id_from_any("/x/y/"), "y");
        assert_eq!(extract_doc_id_from_any("https://host"), "");
    }

    #[test]
    fn host_context_reads_verbatim() {
        let ctx = HostContext::from_value(&json!({
            "base": "https://dms.example",
            "uiLocale": "de",
            "data": {"docId": "/dms/r/r1/o2/D55", "dmsProperties": {"159": "v"}},
            "debug": true
        }));
        assert_eq!(ctx.ui_locale.as_deref(), Some("de"));
        assert_eq!(ctx.document_id().as_deref(), Some("D55"));
        assert_eq!(ctx.data.dms_properties.len(), 1);
        assert!(ctx.debug);
    }

    #[test]
    fn first_candidate_with_an_id_wins() {
        assert_eq!(resolve_doc_id(["", "  ", "/o2/D1"]).as_deref(), Some("D1"));
        assert_eq!(resolve_doc_id([""]), None);
    }
}
