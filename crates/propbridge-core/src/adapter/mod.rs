//! Boundary adapters from raw service documents to canonical shapes.
//!
//! The two deployment variants spell the same concepts differently. Each
//! document type has exactly one adapter that sniffs the variant once and
//! produces one canonical struct; nothing past this module inspects raw
//! field names.

pub mod category;
pub mod detail;
pub mod host;
pub mod search;
pub mod validation;

pub use category::{
    CategorySummary, StoredDocTypes, descriptors_for_variant, descriptors_from_category_response,
};
pub use detail::{
    ConcurrencyToken, DetailDocument, MultiProperty, PropertyOrigin, SingleProperty,
    SystemProperty,
};
pub use host::{HostContext, HostData, extract_doc_id_from_any, resolve_doc_id};
pub use search::SearchItem;
pub use validation::ValidationResponse;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::{fmt, str::FromStr};

/// Flavor of the remote document-management API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentVariant {
    #[default]
    Cloud,
    OnPremise,
}

impl DeploymentVariant {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cloud => "cloud",
            Self::OnPremise => "on-premise",
        }
    }
}

impl fmt::Display for DeploymentVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeploymentVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cloud" => Ok(Self::Cloud),
            "on-premise" | "onpremise" | "on_premise" => Ok(Self::OnPremise),
            other => Err(format!("invalid deployment variant: '{other}'")),
        }
    }
}

/// First of `keys` present on `obj` with a non-null value.
pub(crate) fn first_present<'a>(obj: &'a JsonValue, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !v.is_null())
}

/// First of `keys` holding a non-empty string.
pub(crate) fn first_text(obj: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(JsonValue::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(ToString::to_string)
}
