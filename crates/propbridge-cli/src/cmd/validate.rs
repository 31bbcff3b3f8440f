//! `pbr validate`: the body of the update-validate request.

use clap::Args;
use propbridge_core::config::EngineConfig;
use propbridge_core::model::Scalar;
use std::borrow::Cow;
use std::io::Write;

use super::{SessionArgs, open_session};
use crate::output::{OutputMode, pretty_kv, pretty_section, render_mode};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

fn slot_text(value: Option<&Scalar>) -> Cow<'_, str> {
    value.map_or(Cow::Borrowed("null"), Scalar::as_text)
}

pub fn run_validate(
    args: &ValidateArgs,
    config: &EngineConfig,
    output: OutputMode,
) -> anyhow::Result<()> {
    let session = open_session(&args.session, config)?;
    let changed = session.diff()?.len();
    tracing::info!(document = session.document_id(), changed, "built validation payload");
    let payload = session.validation_payload();

    render_mode(
        output,
        &payload,
        |p, w| {
            for (key, value) in &p.extended_properties {
                writeln!(w, "{key}\t{value}")?;
            }
            for (key, slots) in &p.multivalue_extended_properties {
                for (slot, value) in slots.sorted() {
                    writeln!(w, "{key}\t{slot}\t{}", slot_text(value))?;
                }
            }
            Ok(())
        },
        |p, w| {
            pretty_section(w, &format!("Validate {}", p.id))?;
            pretty_kv(w, "Category", &p.object_definition_id)?;
            pretty_kv(w, "Href", &p.store_object.dmsobject.href)?;
            writeln!(w)?;
            for (key, value) in &p.extended_properties {
                pretty_kv(w, key, value)?;
            }
            for (key, slots) in &p.multivalue_extended_properties {
                writeln!(w, "{key}:")?;
                for (slot, value) in slots.sorted() {
                    writeln!(w, "  [{slot}] {}", slot_text(value))?;
                }
            }
            Ok(())
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_args_parse() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ValidateArgs,
        }
        let w = Wrapper::parse_from(["test", "doc.json"]);
        assert!(w.args.session.set.is_empty());
    }

    #[test]
    fn empty_slot_prints_null() {
        assert_eq!(slot_text(None), "null");
        assert_eq!(slot_text(Some(&Scalar::from("x"))), "x");
    }
}
