//! propbridge-core library.
//!
//! Reconciles document property values between a document-management
//! service and an editing form: it indexes values from search results,
//! detail documents and the host page, maps numeric property ids to UUIDs,
//! coerces values by declared type, and computes minimal change sets and
//! write payloads.
//!
//! # Conventions
//!
//! - **Errors**: [`error::EngineError`] for the two failures the engine
//!   raises; `anyhow::Result` for config loading.
//! - **Logging**: `tracing` macros; malformed upstream input is absorbed
//!   and logged at `debug!`/`warn!`.
//! - **Keys**: form data, snapshots and slot maps are keyed by the resolved
//!   property UUID.

pub mod adapter;
pub mod cache;
pub mod coerce;
pub mod config;
pub mod error;
pub mod extract;
pub mod id_map;
pub mod index;
pub mod model;
pub mod multivalue;
pub mod session;
pub mod submission;

pub use error::{EngineError, ErrorCode};
pub use session::{DocumentSources, EditSession};
