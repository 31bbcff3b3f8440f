//! Delimiter/quote tokenizer for multi-value text input.
//!
//! A token wrapped in double quotes may contain the delimiter. The closing
//! quote only counts when it is followed by the delimiter or the end of the
//! line, so a bare quote inside a token stays part of it.

/// Delimiter used when none is configured.
pub const DEFAULT_DELIMITER: &str = ";";

/// Separators recognized in joined list strings of form data.
pub const LIST_SEPARATORS: &[char] = &[';', ',', '|'];

/// Separators recognized when seeding initial values from joined text.
pub const INITIAL_SEPARATORS: &[char] = &[';', ','];

const QUOTE: char = '"';

/// Split `text` on any of `separators`, trim, and drop empty pieces.
#[must_use]
pub fn split_joined(text: &str, separators: &[char]) -> Vec<String> {
    text.split(separators)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// `true` when `text` contains any of `separators`.
#[must_use]
pub fn has_separator(text: &str, separators: &[char]) -> bool {
    text.contains(separators)
}

/// Tokenize one line.
///
/// An empty delimiter falls back to [`DEFAULT_DELIMITER`].
#[must_use]
pub fn parse_input_line(line: &str, delimiter: &str) -> Vec<String> {
    let delim = if delimiter.is_empty() {
        DEFAULT_DELIMITER
    } else {
        delimiter
    };
    let line = line.trim();
    if line.is_empty() {
        return Vec::new();
    }

    // A line wrapped in quotes is one value unless a quote closes early
    // before the active delimiter.
    if line.len() >= 2 && line.starts_with(QUOTE) && line.ends_with(QUOTE) {
        let inner = &line[1..line.len() - 1];
        if !inner.contains(&format!("{QUOTE}{delim}")) {
            return if inner.is_empty() {
                Vec::new()
            } else {
                vec![inner.to_string()]
            };
        }
    }

    let mut tokens = Vec::new();
    let mut i = 0;
    while i < line.len() {
        let rest = &line[i..];
        if rest.starts_with(delim) {
            i += delim.len();
            continue;
        }

        if rest.starts_with(QUOTE) {
            let start = i + QUOTE.len_utf8();
            let (end, closed) = closing_quote(line, start, delim);
            if end > start {
                tokens.push(line[start..end].to_string());
            }
            if closed {
                i = end + QUOTE.len_utf8();
                if line[i..].starts_with(delim) {
                    i += delim.len();
                }
            } else {
                i = line.len();
            }
        } else {
            let end = rest.find(delim).map_or(line.len(), |off| i + off);
            let token = line[i..end].trim();
            if !token.is_empty() {
                tokens.push(token.to_string());
            }
            i = if end < line.len() { end + delim.len() } else { end };
        }
    }
    tokens
}

/// Byte index of the closing quote at or after `from`, and whether one was
/// found. Without one the token runs to the end of the line.
fn closing_quote(line: &str, from: usize, delim: &str) -> (usize, bool) {
    for (off, ch) in line[from..].char_indices() {
        if ch != QUOTE {
            continue;
        }
        let at = from + off;
        let after = &line[at + QUOTE.len_utf8()..];
        if after.is_empty() || after.starts_with(delim) {
            return (at, true);
        }
    }
    (line.len(), false)
}

/// Tokenize pasted text line by line. Quoting never spans lines.
#[must_use]
pub fn parse_paste_text(text: &str, delimiter: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .flat_map(|line| parse_input_line(line, delimiter))
        .collect()
}
