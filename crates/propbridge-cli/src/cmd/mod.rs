pub mod apply;
pub mod config;
pub mod diff;
pub mod load;
pub mod parse;
pub mod validate;

use clap::Args;
use propbridge_core::EditSession;
use propbridge_core::config::EngineConfig;
use std::path::PathBuf;
use tracing::debug;

use crate::bundle;

/// Arguments shared by every command that loads a document.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Sources bundle (JSON). `-` reads stdin.
    pub sources: PathBuf,

    /// Edit a field before diffing: `KEY=TEXT`, where KEY is a numeric
    /// id or UUID. Multi-value fields split TEXT on the delimiter.
    #[arg(long = "set", value_name = "KEY=TEXT")]
    pub set: Vec<String>,
}

/// Split `KEY=TEXT` at the first `=`.
pub fn parse_assignment(raw: &str) -> anyhow::Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((key, text)) if !key.trim().is_empty() => Ok((key.trim(), text)),
        _ => anyhow::bail!("invalid --set value '{raw}': expected KEY=TEXT"),
    }
}

/// Load the bundle and apply every `--set` edit.
pub fn open_session(args: &SessionArgs, config: &EngineConfig) -> anyhow::Result<EditSession> {
    let sources = bundle::read_sources(&args.sources)?;
    let mut session = EditSession::new(config.clone());
    session.load(&sources)?;
    for raw in &args.set {
        let (key, text) = parse_assignment(raw)?;
        debug!(key, "applying edit");
        session.set_text(key, text);
    }
    Ok(session)
}
