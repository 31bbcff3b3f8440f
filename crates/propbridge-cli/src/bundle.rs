//! Reading the JSON documents a command works on.
//!
//! A sources bundle is one JSON object in the [`DocumentSources`] shape:
//! the search, detail, host and category responses captured for one
//! document, plus optional pending edits.

use propbridge_core::DocumentSources;
use propbridge_core::adapter::ValidationResponse;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("{path} is not a validation response object")]
    NotAnObject { path: PathBuf },
}

/// Read `path` as JSON. `-` reads stdin.
pub fn read_json(path: &Path) -> Result<Value, BundleError> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .map_err(|source| BundleError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(|source| BundleError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?
    };
    debug!(path = %path.display(), bytes = text.len(), "read input document");
    serde_json::from_str(&text).map_err(|source| BundleError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_sources(path: &Path) -> Result<DocumentSources, BundleError> {
    let value = read_json(path)?;
    serde_json::from_value(value).map_err(|source| BundleError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

pub fn read_validation_response(path: &Path) -> Result<ValidationResponse, BundleError> {
    let value = read_json(path)?;
    ValidationResponse::from_value(&value).ok_or_else(|| BundleError::NotAnObject {
        path: path.to_path_buf(),
    })
}
