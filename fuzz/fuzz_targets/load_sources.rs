//! Loads arbitrary JSON as a sources bundle, then diffs and builds the
//! validate body. Malformed shapes must degrade, never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;

use propbridge_core::config::EngineConfig;
use propbridge_core::{DocumentSources, EditSession};

fuzz_target!(|data: &[u8]| {
    let Ok(sources) = serde_json::from_slice::<DocumentSources>(data) else {
        return;
    };
    let mut session = EditSession::new(EngineConfig::default());
    if session.load(&sources).is_err() {
        return;
    }
    let _ = session.diff();
    let _ = session.validation_payload();
});
