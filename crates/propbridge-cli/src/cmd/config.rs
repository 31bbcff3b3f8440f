//! `pbr config`: print the resolved engine configuration.

use anyhow::Context;
use propbridge_core::config::EffectiveConfig;
use std::io::Write;

use crate::output::{OutputMode, render};

pub fn run_config(effective: &EffectiveConfig, output: OutputMode) -> anyhow::Result<()> {
    let engine = toml::to_string_pretty(&effective.engine)
        .context("engine config is not representable as TOML")?;
    render(output, effective, |e, w| {
        writeln!(w, "# output = {}", e.resolved_output)?;
        write!(w, "{engine}")
    })
}
