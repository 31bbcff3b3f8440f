//! `pbr apply`: turn a validation response into the apply and update bodies.

use clap::Args;
use propbridge_core::config::EngineConfig;
use propbridge_core::submission::{ApplyOptions, ApplyPayload, SourceProperties, UpdatePayload};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use super::{SessionArgs, open_session};
use crate::bundle;
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Validation response (JSON) returned by the service.
    #[arg(long, short = 'r', value_name = "FILE")]
    pub response: PathBuf,

    /// Source to map properties against; defaults to the repository source.
    #[arg(long)]
    pub source_id: Option<String>,

    #[arg(long)]
    pub source_category: Option<String>,

    /// Change note stored with the new version.
    #[arg(long)]
    pub alteration_text: Option<String>,

    #[arg(long)]
    pub display_value: Option<String>,

    #[arg(long)]
    pub filename: Option<String>,

    /// Adopt the response as the new baseline and report what is left.
    #[arg(long)]
    pub commit: bool,
}

impl ApplyArgs {
    fn options(&self) -> ApplyOptions {
        ApplyOptions {
            display_value: self.display_value.clone(),
            filename: self.filename.clone(),
            alteration_text: self.alteration_text.clone(),
            source_category: self.source_category.clone(),
            source_id: self.source_id.clone(),
            ..ApplyOptions::default()
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplyReport {
    #[serde(skip)]
    document_id: String,
    apply: ApplyPayload,
    update: UpdatePayload,
    #[serde(skip_serializing_if = "Option::is_none")]
    remaining_changes: Option<usize>,
}

pub fn run_apply(args: &ApplyArgs, config: &EngineConfig, output: OutputMode) -> anyhow::Result<()> {
    let mut session = open_session(&args.session, config)?;
    let response = bundle::read_validation_response(&args.response)?;

    let apply = session.apply_payload(&response, &args.options());
    let update = session.update_payload(&response);
    let remaining_changes = if args.commit {
        session.commit(&response);
        Some(session.diff()?.len())
    } else {
        None
    };
    info!(
        document = session.document_id(),
        properties = apply.source_properties.as_ref().map_or(0, SourceProperties::len),
        committed = args.commit,
        "built apply payload"
    );

    let report = ApplyReport {
        document_id: session.document_id().to_string(),
        apply,
        update,
        remaining_changes,
    };
    render_mode(
        output,
        &report,
        |r, w| {
            if let Some(props) = &r.apply.source_properties {
                for prop in &props.properties {
                    writeln!(w, "{}\t{}", prop.key, prop.values.join("\t"))?;
                }
            }
            Ok(())
        },
        |r, w| {
            pretty_section(w, &format!("Apply {}", r.document_id))?;
            pretty_kv(w, "Source", r.apply.source_id.as_deref().unwrap_or("-"))?;
            if let Some(category) = &r.apply.source_category {
                pretty_kv(w, "Category", category)?;
            }
            if let Some(remaining) = r.remaining_changes {
                pretty_kv(w, "Remaining", remaining.to_string())?;
            }
            writeln!(w)?;
            if let Some(props) = &r.apply.source_properties {
                for prop in &props.properties {
                    pretty_kv(w, &prop.key, prop.values.join("; "))?;
                }
            }
            Ok(())
        },
    )
}
