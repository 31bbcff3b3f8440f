//! `pbr diff`: the changed properties after applying edits.

use clap::Args;
use propbridge_core::config::EngineConfig;
use std::io::Write;
use tracing::info;

use super::{SessionArgs, open_session};
use crate::output::{OutputMode, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct DiffArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

pub fn run_diff(args: &DiffArgs, config: &EngineConfig, output: OutputMode) -> anyhow::Result<()> {
    let session = open_session(&args.session, config)?;
    let diff = session.diff()?;
    info!(
        document = session.document_id(),
        changed = diff.len(),
        "computed diff"
    );

    render_mode(
        output,
        &diff,
        |d, w| {
            for prop in &d.properties {
                writeln!(w, "{}\t{}", prop.key, prop.values.join("\t"))?;
            }
            Ok(())
        },
        |d, w| {
            if d.is_empty() {
                return writeln!(w, "No changes.");
            }
            pretty_section(w, &format!("{} changed", d.len()))?;
            for prop in &d.properties {
                writeln!(w, "{}", prop.key)?;
                for (i, value) in prop.values.iter().enumerate() {
                    if value.is_empty() {
                        writeln!(w, "  {:>3}. (cleared)", i + 1)?;
                    } else {
                        writeln!(w, "  {:>3}. {value}", i + 1)?;
                    }
                }
            }
            Ok(())
        },
    )
}
