#![forbid(unsafe_code)]

mod bundle;
mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{CliError, OutputMode, render_error};
use propbridge_core::config::{EffectiveConfig, load_config_file, resolve_config};
use propbridge_core::{EngineError, ErrorCode};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pbr: property value reconciliation for document metadata forms",
    long_about = None
)]
struct Cli {
    /// Emit JSON output (shorthand for `--format json`).
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Project directory holding `.propbridge/config.toml`.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Engine config file to use instead of the project and user files.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Inspect",
        about = "Load a sources bundle and show its values",
        long_about = "Load a sources bundle (search, detail, host and category responses) and show the initial form values, keyed by property UUID.",
        after_help = "EXAMPLES:\n    # Show initial values\n    pbr load doc.json\n\n    # Include render metadata for every field\n    pbr load doc.json --fields --json"
    )]
    Load(cmd::load::LoadArgs),

    #[command(
        next_help_heading = "Submit",
        about = "Show the properties an edit changes",
        long_about = "Apply --set edits to a loaded document and print the minimal set of changed properties.",
        after_help = "EXAMPLES:\n    # Change one single-value field\n    pbr diff doc.json --set 159='Value B'\n\n    # Replace a multi-value field from typed text\n    pbr diff doc.json --set 106='Draht;Kabel;\"a;b\"' --json"
    )]
    Diff(cmd::diff::DiffArgs),

    #[command(
        next_help_heading = "Submit",
        about = "Build the update-validate request body",
        long_about = "Build the body of the update-validate request, with multi-value slots aligned to the stored slot layout.",
        after_help = "EXAMPLES:\n    # Body for an edited document\n    pbr validate doc.json --set 106='Kabel;Stecker' --json"
    )]
    Validate(cmd::validate::ValidateArgs),

    #[command(
        next_help_heading = "Submit",
        about = "Build apply and update bodies from a validation response",
        long_about = "Turn the service's validation response into the apply-update and full-update request bodies.",
        after_help = "EXAMPLES:\n    # Apply with the repository's default source\n    pbr apply doc.json --response validated.json --json\n\n    # Adopt the response and confirm nothing is left to send\n    pbr apply doc.json -r validated.json --commit"
    )]
    Apply(cmd::apply::ApplyArgs),

    #[command(
        next_help_heading = "Inspect",
        about = "Tokenize multi-value text",
        long_about = "Split typed or pasted text into multi-value tokens using the configured delimiter and quoting rules.",
        after_help = "EXAMPLES:\n    # One typed line\n    pbr parse 'Rohr;Kabel;\"a;b\"'\n\n    # A pasted block, one or more values per line\n    pbr parse --file values.txt --json"
    )]
    Parse(cmd::parse::ParseArgs),

    #[command(
        next_help_heading = "Inspect",
        about = "Show the resolved configuration",
        after_help = "EXAMPLES:\n    pbr config\n    pbr --root ./project config --json"
    )]
    Config,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PROPBRIDGE_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "propbridge=debug,info"
        } else {
            "propbridge=info,warn"
        })
    });

    let format = env::var("PROPBRIDGE_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

impl Cli {
    /// Project and user config, with `--config` replacing the engine part.
    fn effective_config(&self) -> anyhow::Result<EffectiveConfig> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => env::current_dir()?,
        };
        let mut effective = resolve_config(&root, self.json)?;
        if let Some(path) = &self.config {
            effective.engine = load_config_file(path)?;
        }
        Ok(effective)
    }

    fn run(&self, effective: &EffectiveConfig, output: OutputMode) -> anyhow::Result<()> {
        let engine = &effective.engine;
        match &self.command {
            Commands::Load(args) => cmd::load::run_load(args, engine, output),
            Commands::Diff(args) => cmd::diff::run_diff(args, engine, output),
            Commands::Validate(args) => cmd::validate::run_validate(args, engine, output),
            Commands::Apply(args) => cmd::apply::run_apply(args, engine, output),
            Commands::Parse(args) => cmd::parse::run_parse(args, engine, output),
            Commands::Config => cmd::config::run_config(effective, output),
        }
    }
}

/// Map a command failure to a coded error for rendering.
fn classify(err: &anyhow::Error) -> CliError {
    if let Some(engine) = err.downcast_ref::<EngineError>() {
        return CliError::from(engine);
    }
    if let Some(bundle) = err.downcast_ref::<bundle::BundleError>() {
        return CliError::with_code(bundle.to_string(), ErrorCode::FixtureUnreadable);
    }
    CliError::new(format!("{err:#}"))
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    let effective = match cli.effective_config() {
        Ok(effective) => effective,
        Err(err) => {
            let mode = output::fallback_output_mode(cli.format, cli.json);
            let error = CliError::with_code(format!("{err:#}"), ErrorCode::ConfigParseError);
            let _ = render_error(mode, &error);
            return ExitCode::FAILURE;
        }
    };
    let output = output::resolve_output_mode(cli.format, &effective.resolved_output);
    debug!(?output, "starting command");

    match cli.run(&effective, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let _ = render_error(output, &classify(&err));
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_parses_after_subcommand() {
        let cli = Cli::parse_from(["pbr", "diff", "doc.json", "--json"]);
        assert!(cli.json);
        assert!(matches!(cli.command, Commands::Diff(_)));
    }

    #[test]
    fn format_flag_is_global() {
        let cli = Cli::parse_from(["pbr", "parse", "a;b", "--format", "text"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn root_and_config_are_global() {
        let cli = Cli::parse_from([
            "pbr", "--root", "/tmp/p", "config", "--config", "/tmp/c.toml",
        ]);
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/p")));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn engine_errors_keep_their_code() {
        let err = anyhow::Error::new(EngineError::ValueTooLong {
            key: "uuid-1".into(),
            bytes: 256,
            limit: 255,
        });
        assert_eq!(classify(&err).error_code.as_deref(), Some("E2002"));
    }

    #[test]
    fn bundle_errors_are_fixture_errors() {
        let err = anyhow::Error::new(bundle::BundleError::NotAnObject {
            path: PathBuf::from("r.json"),
        });
        assert_eq!(classify(&err).error_code.as_deref(), Some("E1002"));
    }

    #[test]
    fn other_errors_have_no_code() {
        let err = anyhow::anyhow!("boom");
        let cli = classify(&err);
        assert!(cli.error_code.is_none());
        assert_eq!(cli.message, "boom");
    }
}
