//! `pbr parse`: tokenize typed or pasted multi-value text.

use clap::Args;
use propbridge_core::config::EngineConfig;
use propbridge_core::multivalue::{parse_input_line, parse_paste_text};
use std::io::Write;
use std::path::PathBuf;

use crate::bundle::BundleError;
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Text to tokenize, as typed into one input line.
    #[arg(conflicts_with = "file")]
    pub text: Option<String>,

    /// Read the text from a file and tokenize it as a paste, line by line.
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,

    /// Override the configured delimiter.
    #[arg(long, short = 'd')]
    pub delimiter: Option<String>,
}

fn tokenize(args: &ParseArgs, delimiter: &str) -> anyhow::Result<Vec<String>> {
    match (&args.text, &args.file) {
        (Some(text), _) => Ok(parse_input_line(text, delimiter)),
        (None, Some(path)) => {
            let text = std::fs::read_to_string(path).map_err(|source| BundleError::Unreadable {
                path: path.clone(),
                source,
            })?;
            Ok(parse_paste_text(&text, delimiter))
        }
        (None, None) => anyhow::bail!("nothing to parse: pass TEXT or --file"),
    }
}

pub fn run_parse(args: &ParseArgs, config: &EngineConfig, output: OutputMode) -> anyhow::Result<()> {
    let delimiter = args
        .delimiter
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(config.parsing.delimiter.as_str());
    let tokens = tokenize(args, delimiter)?;
    tracing::debug!(delimiter, count = tokens.len(), "tokenized input");

    render(output, &tokens, |tokens, w| {
        for token in tokens {
            writeln!(w, "{token}")?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write as _;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: ParseArgs,
    }

    #[test]
    fn inline_text_uses_line_rules() {
        let w = Wrapper::parse_from(["test", "a; \"b;c\" ;d"]);
        let tokens = tokenize(&w.args, ";").expect("tokens");
        assert_eq!(tokens.first().map(String::as_str), Some("a"));
        assert!(tokens.contains(&"d".to_string()));
    }

    #[test]
    fn file_is_read_as_paste() {
        let mut file = tempfile::NamedTempFile::new().expect("temp");
        write!(file, "a;b\r\nc\n\n\"d;e\"").expect("write");
        let path = file.path().to_string_lossy().into_owned();
        let w = Wrapper::parse_from(["test", "--file", path.as_str()]);
        let tokens = tokenize(&w.args, ";").expect("tokens");
        assert_eq!(tokens, vec!["a", "b", "c", "d;e"]);
    }

    #[test]
    fn custom_delimiter() {
        let w = Wrapper::parse_from(["test", "-d", "|", "x|y"]);
        assert_eq!(w.args.delimiter.as_deref(), Some("|"));
        assert_eq!(tokenize(&w.args, "|").expect("tokens"), vec!["x", "y"]);
    }

    #[test]
    fn text_and_file_conflict() {
        assert!(Wrapper::try_parse_from(["test", "a", "--file", "x.txt"]).is_err());
    }

    #[test]
    fn nothing_to_parse_is_an_error() {
        let w = Wrapper::parse_from(["test"]);
        assert!(tokenize(&w.args, ";").is_err());
    }
}
