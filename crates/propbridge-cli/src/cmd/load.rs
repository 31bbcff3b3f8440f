//! `pbr load`: show what a sources bundle loads into.

use clap::Args;
use propbridge_core::coerce::FieldMeta;
use propbridge_core::config::EngineConfig;
use propbridge_core::model::{FieldValue, FormData, PreviousValues, SlotMaps};
use serde::Serialize;
use std::io::Write;

use super::{SessionArgs, open_session};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Include render metadata for every field.
    #[arg(long)]
    pub fields: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadReport {
    document_id: String,
    repo_id: Option<String>,
    category_id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldMeta>,
    values: FormData,
    previous: PreviousValues,
    slot_maps: SlotMaps,
}

/// Values as one line of text; list members are joined with `; `.
pub fn display_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Single(s) => s.as_text().into_owned(),
        FieldValue::Multi(items) => items
            .iter()
            .map(|s| s.as_text())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

pub fn run_load(args: &LoadArgs, config: &EngineConfig, output: OutputMode) -> anyhow::Result<()> {
    let session = open_session(&args.session, config)?;
    let report = LoadReport {
        document_id: session.document_id().to_string(),
        repo_id: session.repo_id().map(str::to_string),
        category_id: session.category_id().map(str::to_string),
        fields: if args.fields {
            session.fields()
        } else {
            Vec::new()
        },
        values: session.form().clone(),
        previous: session.previous_values().clone(),
        slot_maps: session.slot_maps().clone(),
    };

    render_mode(
        output,
        &report,
        |r, w| {
            for (key, value) in &r.values {
                writeln!(w, "{key}\t{}", display_value(value))?;
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("Document {}", r.document_id))?;
            pretty_kv(w, "Repository", r.repo_id.as_deref().unwrap_or("-"))?;
            pretty_kv(w, "Category", r.category_id.as_deref().unwrap_or("-"))?;
            writeln!(w)?;
            for field in &r.fields {
                let flags = [
                    (field.is_multi, "multi"),
                    (field.read_only, "read-only"),
                    (field.is_system, "system"),
                ]
                .iter()
                .filter_map(|(on, name)| on.then_some(*name))
                .collect::<Vec<_>>()
                .join(",");
                writeln!(w, "  {:<36} {:<24} {flags}", field.uuid, field.label)?;
            }
            if !r.fields.is_empty() {
                writeln!(w)?;
            }
            for (key, value) in &r.values {
                pretty_kv(w, key, display_value(value))?;
            }
            Ok(())
        },
    )
}
