use std::fmt;

/// Machine-readable error codes for callers that branch on failure kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    FixtureUnreadable,
    DuplicateIdConflict,
    ValueTooLong,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1001",
            Self::FixtureUnreadable => "E1002",
            Self::DuplicateIdConflict => "E2001",
            Self::ValueTooLong => "E2002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::FixtureUnreadable => "Input document could not be read",
            Self::DuplicateIdConflict => "Conflicting UUIDs for one numeric property id",
            Self::ValueTooLong => "Property value exceeds the storage width",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .propbridge/config.toml and retry."),
            Self::FixtureUnreadable => Some("Check the path and that the file holds valid JSON."),
            Self::DuplicateIdConflict => {
                Some("Inspect the object definitions or set `on_duplicate = \"last\"`.")
            }
            Self::ValueTooLong => Some("Shorten the value to at most 255 bytes of UTF-8."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures the engine raises to its caller.
///
/// Malformed upstream documents never produce an error; they degrade to
/// empty structures. Only these two conditions propagate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Two different UUIDs claim the same numeric id under the `error` policy.
    #[error("duplicate id \"{numeric_id}\" with conflicting uniqueId: \"{existing}\" vs \"{incoming}\"")]
    DuplicateIdConflict {
        numeric_id: String,
        existing: String,
        incoming: String,
    },

    /// A single value is wider than the remote storage field.
    #[error("value exceeds {limit} bytes for field {key} ({bytes} bytes)")]
    ValueTooLong {
        key: String,
        bytes: usize,
        limit: usize,
    },
}

impl EngineError {
    /// The stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::DuplicateIdConflict { .. } => ErrorCode::DuplicateIdConflict,
            Self::ValueTooLong { .. } => ErrorCode::ValueTooLong,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineError, ErrorCode};
    use std::collections::HashSet;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::FixtureUnreadable,
            ErrorCode::DuplicateIdConflict,
            ErrorCode::ValueTooLong,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::ValueTooLong.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn value_too_long_names_the_field() {
        let err = EngineError::ValueTooLong {
            key: "uuid-7".into(),
            bytes: 256,
            limit: 255,
        };
        assert_eq!(err.code(), ErrorCode::ValueTooLong);
        assert!(err.to_string().contains("uuid-7"));
        assert!(err.to_string().contains("255"));
    }
}
