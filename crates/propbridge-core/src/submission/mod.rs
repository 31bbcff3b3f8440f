//! Submission pipeline: meta index, previous-value snapshot, diff, and the
//! request bodies for validate, apply, and full update.
//!
//! All maps here are keyed by the resolved property UUID (see
//! [`crate::id_map::IdMap::resolve`]); numeric ids only appear on the wire.

pub mod diff;
pub mod meta;
pub mod response;
pub mod snapshot;
pub mod validate;

pub use diff::{DEFAULT_MAX_VALUE_BYTES, SourceProperties, SourceProperty, collect_source_properties};
pub use meta::{MetaEntry, MetaIndex};
pub use response::{
    ApplyOptions, ApplyPayload, UpdatePayload, build_apply_payload,
    build_apply_payload_from_validation_response, default_source_id,
    extract_values_from_validation_response, source_properties_from_validation_response,
    update_payload_from_validation_response,
};
pub use snapshot::{make_previous_values, multivalue_slot_maps};
pub use validate::{
    DmsObjectLink, SYSTEM_PROPERTY_WHITELIST, StoreObject, ValidationPayload, ValidationRequest,
    build_validation_payload,
};

/// Percent-encode a URL path component.
///
/// ASCII letters, digits and `-_.!~*'()` pass through; everything else is
/// written as `%XX` per UTF-8 byte.
#[must_use]
pub fn encode_component(s: &str) -> String {
    const UNRESERVED: &[u8] = b"-_.!~*'()";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if b.is_ascii_alphanumeric() || UNRESERVED.contains(&b) {
            out.push(char::from(b));
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}
